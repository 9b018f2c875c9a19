use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::error::{Result, SwitchboardError};
use crate::store::db::{SwitchboardDb, parse_dt};

/// Default number of rows returned by a recall.
pub const DEFAULT_RECALL_LIMIT: u32 = 5;

/// A stored note with optional tags.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

fn memory_token() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    token[..12].to_string()
}

// Escape LIKE metacharacters so user queries match literally (ESCAPE '\').
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl SwitchboardDb {
    /// Store a note. Content is unique: remembering the same text again
    /// updates its tags and returns the existing row's id.
    pub fn remember(&self, content: &str, tags: &[String]) -> Result<Memory> {
        if content.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "memory content must be non-empty".into(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        let tags_json = serde_json::to_string(tags)?;

        tx.execute(
            "INSERT INTO memories (id, content, tags, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(content) DO UPDATE SET tags = excluded.tags",
            params![memory_token(), content, &tags_json, &now],
        )?;

        // On the update path the row keeps its original id and created_at.
        let (id, created_at): (String, String) = tx.query_row(
            "SELECT id, created_at FROM memories WHERE content = ?1",
            params![content],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.commit()?;

        Ok(Memory {
            id,
            content: content.to_string(),
            tags: tags.to_vec(),
            created_at: parse_dt(&created_at),
        })
    }

    /// Substring search over content, newest first.
    pub fn recall(&self, query: &str, limit: u32) -> Result<Vec<Memory>> {
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.conn.prepare(
            "SELECT id, content, tags, created_at FROM memories
             WHERE content LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC, id LIMIT ?2",
        )?;
        let raw: Vec<(String, String, String, String)> = stmt
            .query_map(params![&pattern, limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut memories = Vec::with_capacity(raw.len());
        for (id, content, tags_json, created_at) in raw {
            memories.push(Memory {
                id,
                content,
                tags: serde_json::from_str(&tags_json)?,
                created_at: parse_dt(&created_at),
            });
        }
        Ok(memories)
    }

    /// Delete a note by id. Unknown ids are a silent no-op.
    pub fn forget(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
