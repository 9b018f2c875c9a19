use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::{Result, SwitchboardError};

// ---------------------------------------------------------------------------
// Helper: parse RFC 3339 timestamps from SQLite TEXT columns
// ---------------------------------------------------------------------------

pub(crate) fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_dt_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|v| parse_dt(&v))
}

// ---------------------------------------------------------------------------
// SwitchboardDb
// ---------------------------------------------------------------------------

/// The shared hub store. One connection per process, created at startup and
/// passed by reference to every operation; SQLite's own locking (WAL +
/// busy_timeout) is the only mutual-exclusion mechanism across processes.
pub struct SwitchboardDb {
    pub(crate) conn: Connection,
}

impl SwitchboardDb {
    /// Open (or create) the hub database at the given file path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA busy_timeout=5000;",
        )?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA busy_timeout=5000;")?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Open the database at the resolved location, creating its parent
    /// directory if needed. Resolution order: explicit override,
    /// `SWITCHBOARD_DB`, then `$HOME/.switchboard/switchboard.db`.
    pub fn from_env(override_path: Option<&Path>) -> Result<Self> {
        let path = resolve_db_path(override_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(&path)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS agents (
                name TEXT PRIMARY KEY,
                program TEXT NOT NULL DEFAULT 'unknown',
                model TEXT NOT NULL DEFAULT 'unknown',
                task TEXT NOT NULL DEFAULT '',
                last_seen TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL DEFAULT '',
                thread_id TEXT,
                created_at TEXT NOT NULL,
                read_at TEXT,
                ack_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_messages_recipient_read
                ON messages(recipient, read_at);

            CREATE TABLE IF NOT EXISTS locks (
                path TEXT PRIMARY KEY,
                holder TEXT NOT NULL,
                reason TEXT,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_locks_holder
                ON locks(holder);
            CREATE INDEX IF NOT EXISTS idx_locks_expires
                ON locks(expires_at);

            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL UNIQUE,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Expose the raw connection (for tests or advanced usage).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Resolve the database location without opening it.
pub fn resolve_db_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = override_path {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("SWITCHBOARD_DB")
        && !p.trim().is_empty()
    {
        return Ok(PathBuf::from(p));
    }
    let home = std::env::var("HOME").map_err(|_| SwitchboardError::NoDatabasePath)?;
    if home.trim().is_empty() {
        return Err(SwitchboardError::NoDatabasePath);
    }
    Ok(Path::new(&home).join(".switchboard").join("switchboard.db"))
}

// ===========================================================================
// Tests
// ===========================================================================
