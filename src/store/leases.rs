use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;

use crate::error::{Result, SwitchboardError};
use crate::store::db::{SwitchboardDb, parse_dt};

/// Default lease lifetime when the caller does not pass one.
pub const DEFAULT_LEASE_TTL_SECS: i64 = 1800;

/// An exclusive, time-bounded claim on a file path.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Lease {
    pub path: String,
    pub holder: String,
    pub reason: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Result of a lease acquisition attempt. Conflict is a structured outcome,
/// not an error, so callers can branch on the current holder's identity.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeaseOutcome {
    Locked {
        path: String,
        expires_at: DateTime<Utc>,
    },
    Conflict {
        path: String,
        holder: String,
    },
}

impl SwitchboardDb {
    /// Acquire or renew the lease on `path` for `holder`.
    ///
    /// The conflict check and the grant run against the same transaction so
    /// two concurrent acquires on one path cannot both observe "no live
    /// lease". A row held by the same requester renews; an expired row is
    /// reclaimable by anyone. On conflict nothing is written.
    pub fn acquire_lease(
        &self,
        path: &str,
        holder: &str,
        reason: Option<&str>,
        ttl_secs: i64,
    ) -> Result<LeaseOutcome> {
        if path.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "lock path must be non-empty".into(),
            ));
        }
        if holder.is_empty() {
            return Err(SwitchboardError::InvalidArgument(
                "lock holder must be non-empty".into(),
            ));
        }
        if ttl_secs <= 0 {
            return Err(SwitchboardError::InvalidArgument(
                "lock ttl must be a positive number of seconds".into(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;

        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let live_holder: Option<String> = tx
            .query_row(
                "SELECT holder FROM locks WHERE path = ?1 AND expires_at > ?2",
                params![path, &now_str],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(current) = live_holder
            && current != holder
        {
            // Dropping the transaction rolls back; the live lease is untouched.
            return Ok(LeaseOutcome::Conflict {
                path: path.to_string(),
                holder: current,
            });
        }

        let expires_at = (now + chrono::Duration::seconds(ttl_secs)).to_rfc3339();
        tx.execute(
            "INSERT INTO locks (path, holder, reason, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET
                holder = excluded.holder,
                reason = excluded.reason,
                expires_at = excluded.expires_at",
            params![path, holder, reason, &expires_at],
        )?;
        tx.commit()?;

        Ok(LeaseOutcome::Locked {
            path: path.to_string(),
            expires_at: parse_dt(&expires_at),
        })
    }

    /// Release a lease. Deletes only when both path and holder match;
    /// anything else (wrong holder, unknown path, already expired) is a
    /// silent no-op — release is idempotent.
    pub fn release_lease(&self, path: &str, holder: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM locks WHERE path = ?1 AND holder = ?2",
            params![path, holder],
        )?;
        Ok(())
    }

    /// List live leases (`expires_at > now`), optionally filtered to one
    /// holder. Expired rows are filtered at read time, never deleted here.
    pub fn list_leases(&self, holder: Option<&str>) -> Result<Vec<Lease>> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare(
            "SELECT path, holder, reason, expires_at FROM locks
             WHERE expires_at > ?1 AND (?2 IS NULL OR holder = ?2)
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![&now, holder], |row| {
            Ok(Lease {
                path: row.get(0)?,
                holder: row.get(1)?,
                reason: row.get(2)?,
                expires_at: parse_dt(&row.get::<_, String>(3)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
