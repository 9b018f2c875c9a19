use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::error::{Result, SwitchboardError};
use crate::store::db::{SwitchboardDb, parse_dt, parse_dt_opt};

/// Default inbox page size.
pub const DEFAULT_INBOX_LIMIT: u32 = 20;

/// A directed message between agents.
///
/// Lifecycle is monotonic: `read_at`/`ack_at` start unset and are written at
/// most once, with `read_at <= ack_at` whenever both are set.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub thread_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub ack_at: Option<DateTime<Utc>>,
}

const MESSAGE_COLUMNS: &str =
    "id, sender, recipient, subject, body, thread_id, created_at, read_at, ack_at";

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        thread_id: row.get(5)?,
        created_at: parse_dt(&row.get::<_, String>(6)?),
        read_at: parse_dt_opt(row.get(7)?),
        ack_at: parse_dt_opt(row.get(8)?),
    })
}

impl SwitchboardDb {
    /// Append a new message. The recipient does not have to be a registered
    /// agent — agents may register after mail is addressed to them.
    pub fn send_message(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
        thread_id: Option<&str>,
    ) -> Result<Message> {
        if sender.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "message sender must be non-empty".into(),
            ));
        }
        if recipient.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "message recipient must be non-empty".into(),
            ));
        }
        if subject.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "message subject must be non-empty".into(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO messages (sender, recipient, subject, body, thread_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![sender, recipient, subject, body, thread_id, &now],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(Message {
            id,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            thread_id: thread_id.map(|s| s.to_string()),
            created_at: parse_dt(&now),
            read_at: None,
            ack_at: None,
        })
    }

    /// Point-in-time inbox snapshot for `agent`, newest first, truncated to
    /// `limit`. With `unread_only`, messages that have a `read_at` are
    /// skipped (acknowledged-but-unread cannot occur; ack backfills read).
    pub fn fetch_inbox(&self, agent: &str, unread_only: bool, limit: u32) -> Result<Vec<Message>> {
        let sql = if unread_only {
            format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE recipient = ?1 AND read_at IS NULL
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            )
        } else {
            format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE recipient = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            )
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![agent, limit as i64], map_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Mark a message read. Only the row matching both `id` and
    /// `recipient = agent` is touched; the first read timestamp wins and is
    /// never overwritten. A non-matching id/agent pair is a silent no-op.
    pub fn mark_read(&self, id: i64, agent: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE messages SET read_at = COALESCE(read_at, ?1)
             WHERE id = ?2 AND recipient = ?3",
            params![&now, id, agent],
        )?;
        Ok(())
    }

    /// Acknowledge a message. Sets `ack_at` and, when the message was never
    /// read, backfills `read_at` with the same instant in the same write, so
    /// `read_at <= ack_at` holds whenever both are set. Matching and no-op
    /// behavior mirror [`mark_read`](Self::mark_read).
    pub fn ack_message(&self, id: i64, agent: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE messages SET ack_at = COALESCE(ack_at, ?1),
                                 read_at = COALESCE(read_at, ?1)
             WHERE id = ?2 AND recipient = ?3",
            params![&now, id, agent],
        )?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn get_message(db: &SwitchboardDb, id: i64) -> Message {
        db.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                map_message,
            )
            .unwrap()
    }

    #[test]
    fn send_and_fetch_inbox() {
        let db = SwitchboardDb::open_memory().unwrap();

        let msg = db
            .send_message("alice", "bob", "[TASK] review auth", "see src/auth.rs", None)
            .unwrap();
        assert!(msg.id >= 1);
        assert!(msg.read_at.is_none());
        assert!(msg.ack_at.is_none());

        let inbox = db.fetch_inbox("bob", true, DEFAULT_INBOX_LIMIT).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].subject, "[TASK] review auth");
        assert_eq!(inbox[0].body, "see src/auth.rs");

        // Sender's inbox is unaffected.
        assert!(db.fetch_inbox("alice", true, 20).unwrap().is_empty());
    }

    #[test]
    fn message_ids_are_monotonic() {
        let db = SwitchboardDb::open_memory().unwrap();
        let m1 = db.send_message("a", "b", "first", "", None).unwrap();
        let m2 = db.send_message("a", "b", "second", "", None).unwrap();
        assert!(m2.id > m1.id);
    }

    #[test]
    fn inbox_newest_first_and_limited() {
        let db = SwitchboardDb::open_memory().unwrap();
        for i in 0..5 {
            db.send_message("a", "b", &format!("msg {i}"), "", None)
                .unwrap();
        }

        let inbox = db.fetch_inbox("b", true, 3).unwrap();
        assert_eq!(inbox.len(), 3);
        assert_eq!(inbox[0].subject, "msg 4");
        assert_eq!(inbox[1].subject, "msg 3");
        assert_eq!(inbox[2].subject, "msg 2");
    }

    #[test]
    fn inbox_unread_filter() {
        let db = SwitchboardDb::open_memory().unwrap();
        let m1 = db.send_message("a", "x", "one", "", None).unwrap();
        db.send_message("a", "x", "two", "", None).unwrap();
        db.send_message("a", "x", "three", "", None).unwrap();

        db.mark_read(m1.id, "x").unwrap();

        let unread = db.fetch_inbox("x", true, 20).unwrap();
        assert_eq!(unread.len(), 2);
        assert_eq!(unread[0].subject, "three");
        assert_eq!(unread[1].subject, "two");

        let all = db.fetch_inbox("x", false, 20).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn mark_read_first_write_wins() {
        let db = SwitchboardDb::open_memory().unwrap();
        let msg = db.send_message("a", "b", "hi", "", None).unwrap();

        db.mark_read(msg.id, "b").unwrap();
        let first = get_message(&db, msg.id).read_at.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        db.mark_read(msg.id, "b").unwrap();
        assert_eq!(get_message(&db, msg.id).read_at.unwrap(), first);
    }

    #[test]
    fn ack_backfills_read_with_same_instant() {
        let db = SwitchboardDb::open_memory().unwrap();
        let msg = db.send_message("a", "b", "hi", "", None).unwrap();

        db.ack_message(msg.id, "b").unwrap();
        let stored = get_message(&db, msg.id);
        assert_eq!(stored.read_at, stored.ack_at);
        assert!(stored.ack_at.is_some());
    }

    #[test]
    fn ack_after_read_preserves_read_timestamp() {
        let db = SwitchboardDb::open_memory().unwrap();
        let msg = db.send_message("a", "b", "hi", "", None).unwrap();

        db.mark_read(msg.id, "b").unwrap();
        let read_at = get_message(&db, msg.id).read_at.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        db.ack_message(msg.id, "b").unwrap();

        let stored = get_message(&db, msg.id);
        assert_eq!(stored.read_at.unwrap(), read_at);
        assert!(stored.ack_at.unwrap() >= stored.read_at.unwrap());
    }

    #[test]
    fn acknowledged_state_is_terminal() {
        let db = SwitchboardDb::open_memory().unwrap();
        let msg = db.send_message("a", "b", "hi", "", None).unwrap();

        db.ack_message(msg.id, "b").unwrap();
        let first = get_message(&db, msg.id);

        std::thread::sleep(std::time::Duration::from_millis(10));
        db.ack_message(msg.id, "b").unwrap();
        db.mark_read(msg.id, "b").unwrap();
        assert_eq!(get_message(&db, msg.id), first);
    }

    #[test]
    fn cross_recipient_isolation() {
        let db = SwitchboardDb::open_memory().unwrap();
        let msg = db.send_message("a", "b", "hi", "", None).unwrap();

        // An agent that is not the recipient cannot move the state.
        db.mark_read(msg.id, "mallory").unwrap();
        db.ack_message(msg.id, "mallory").unwrap();

        let stored = get_message(&db, msg.id);
        assert!(stored.read_at.is_none());
        assert!(stored.ack_at.is_none());
    }

    #[test]
    fn mark_read_unknown_id_is_noop_success() {
        let db = SwitchboardDb::open_memory().unwrap();
        db.mark_read(999, "nobody").unwrap();
        db.ack_message(999, "nobody").unwrap();
    }

    #[test]
    fn thread_id_is_stored() {
        let db = SwitchboardDb::open_memory().unwrap();
        let msg = db
            .send_message("a", "b", "re: plan", "", Some("thread-7"))
            .unwrap();
        let inbox = db.fetch_inbox("b", true, 20).unwrap();
        assert_eq!(inbox[0].thread_id.as_deref(), Some("thread-7"));
        assert_eq!(inbox[0].id, msg.id);
    }

    #[test]
    fn send_validates_arguments() {
        let db = SwitchboardDb::open_memory().unwrap();
        assert_eq!(
            db.send_message("", "b", "s", "", None).unwrap_err().code(),
            "invalid_argument"
        );
        assert_eq!(
            db.send_message("a", "", "s", "", None).unwrap_err().code(),
            "invalid_argument"
        );
        assert_eq!(
            db.send_message("a", "b", "", "", None).unwrap_err().code(),
            "invalid_argument"
        );
    }
}
