//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.  It also owns the timestamp
//! clamp: assigned `date_sent` values are monotonically non-decreasing for the
//! lifetime of the store, even across restarts with a rolled-back clock.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;

use crate::error::Result;
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    /// Largest `date_sent` handed out so far (unix millis).
    last_assigned_ms: i64,
}

impl Database {
    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Run schema migrations.
        migrations::run_migrations(&conn)?;

        // Seed the clamp from whatever is already on disk, so timestamps stay
        // non-decreasing even if the wall clock went backwards since the last
        // run.
        let last_assigned_ms = max_persisted_timestamp(&conn)?;

        tracing::info!(
            path = %path.display(),
            last_timestamp_ms = last_assigned_ms,
            "opened database"
        );

        Ok(Self {
            conn,
            last_assigned_ms,
        })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed helpers, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Assign the next send timestamp: `max(now, last_assigned)`.
    pub(crate) fn next_timestamp_ms(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let assigned = now.max(self.last_assigned_ms);
        self.last_assigned_ms = assigned;
        assigned
    }
}

/// Largest `date_sent` across both message tables, or 0 for a fresh database.
fn max_persisted_timestamp(conn: &Connection) -> Result<i64> {
    let group: i64 = conn.query_row(
        "SELECT COALESCE(MAX(date_sent), 0) FROM group_messages",
        [],
        |row| row.get(0),
    )?;
    let private: i64 = conn.query_row(
        "SELECT COALESCE(MAX(date_sent), 0) FROM private_messages",
        [],
        |row| row.get(0),
    )?;
    Ok(group.max(private))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn timestamps_never_decrease() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let mut prev = 0;
        for _ in 0..100 {
            let ts = db.next_timestamp_ms();
            assert!(ts >= prev);
            prev = ts;
        }
    }

    #[test]
    fn reopen_seeds_clamp_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let future_ms = Utc::now().timestamp_millis() + 60_000;

        {
            let db = Database::open_at(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO group_messages (room, from_user, message, date_sent)
                     VALUES ('general', 'alice', 'from the future', ?1)",
                    [future_ms],
                )
                .unwrap();
        }

        let mut db = Database::open_at(&path).unwrap();
        assert!(db.next_timestamp_ms() >= future_ms);
    }
}
