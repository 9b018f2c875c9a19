use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::error::{Result, SwitchboardError};
use crate::store::db::{SwitchboardDb, parse_dt};

/// A registered agent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgentRecord {
    pub name: String,
    pub program: String,
    pub model: String,
    pub task: String,
    pub last_seen: DateTime<Utc>,
}

impl SwitchboardDb {
    /// Register an agent, or refresh an existing registration. Upsert keyed
    /// by name; every field including `last_seen` is replaced.
    pub fn register_agent(
        &self,
        name: &str,
        program: &str,
        model: &str,
        task: &str,
    ) -> Result<AgentRecord> {
        if name.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "agent name must be non-empty".into(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO agents (name, program, model, task, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                program = excluded.program,
                model = excluded.model,
                task = excluded.task,
                last_seen = excluded.last_seen",
            params![name, program, model, task, &now],
        )?;

        Ok(AgentRecord {
            name: name.to_string(),
            program: program.to_string(),
            model: model.to_string(),
            task: task.to_string(),
            last_seen: parse_dt(&now),
        })
    }

    /// List all registered agents, most recently seen first.
    pub fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, program, model, task, last_seen
             FROM agents ORDER BY last_seen DESC, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AgentRecord {
                name: row.get(0)?,
                program: row.get(1)?,
                model: row.get(2)?,
                task: row.get(3)?,
                last_seen: parse_dt(&row.get::<_, String>(4)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
