//! Append and history queries for group and private messages.
//!
//! Messages are append-only: there is no update or delete path.  History
//! queries return the newest `limit` entries, oldest-first, with the insertion
//! id breaking ties between equal timestamps.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{GroupMessage, PrivateMessage};

impl Database {
    // ------------------------------------------------------------------
    // Append
    // ------------------------------------------------------------------

    /// Append a room message, assigning the server-side timestamp.
    ///
    /// The returned record carries the assigned `date_sent`; callers must not
    /// fan the message out unless this call succeeded.
    pub fn append_group_message(
        &mut self,
        room: &str,
        from_user: &str,
        message: &str,
    ) -> Result<GroupMessage> {
        let ms = self.next_timestamp_ms();

        self.conn().execute(
            "INSERT INTO group_messages (room, from_user, message, date_sent)
             VALUES (?1, ?2, ?3, ?4)",
            params![room, from_user, message, ms],
        )?;

        Ok(GroupMessage {
            from_user: from_user.to_string(),
            room: room.to_string(),
            message: message.to_string(),
            date_sent: millis_to_datetime(ms)?,
        })
    }

    /// Append a private message, assigning the server-side timestamp.
    pub fn append_private_message(
        &mut self,
        from_user: &str,
        to_user: &str,
        message: &str,
    ) -> Result<PrivateMessage> {
        let ms = self.next_timestamp_ms();

        self.conn().execute(
            "INSERT INTO private_messages (from_user, to_user, message, date_sent)
             VALUES (?1, ?2, ?3, ?4)",
            params![from_user, to_user, message, ms],
        )?;

        Ok(PrivateMessage {
            from_user: from_user.to_string(),
            to_user: to_user.to_string(),
            message: message.to_string(),
            date_sent: millis_to_datetime(ms)?,
        })
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// The newest `limit` messages for a room, returned oldest-first.
    ///
    /// A room with no history yields an empty vec, never an error.
    pub fn room_history(&self, room: &str, limit: u32) -> Result<Vec<GroupMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT room, from_user, message, date_sent
             FROM group_messages
             WHERE room = ?1
             ORDER BY date_sent DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![room, limit], row_to_group_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        // Newest window, presented in send order.
        messages.reverse();
        Ok(messages)
    }

    /// The newest `limit` messages between two users, returned oldest-first.
    ///
    /// Matches the unordered pair in either direction, so the result is
    /// identical whichever way round the arguments are passed.
    pub fn private_history(
        &self,
        user_a: &str,
        user_b: &str,
        limit: u32,
    ) -> Result<Vec<PrivateMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT from_user, to_user, message, date_sent
             FROM private_messages
             WHERE (from_user = ?1 AND to_user = ?2)
                OR (from_user = ?2 AND to_user = ?1)
             ORDER BY date_sent DESC, id DESC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![user_a, user_b, limit], row_to_private_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        messages.reverse();
        Ok(messages)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(StoreError::InvalidTimestamp(ms))
}

fn row_to_group_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMessage> {
    let ms: i64 = row.get(3)?;
    Ok(GroupMessage {
        room: row.get(0)?,
        from_user: row.get(1)?,
        message: row.get(2)?,
        date_sent: row_timestamp(3, ms)?,
    })
}

fn row_to_private_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrivateMessage> {
    let ms: i64 = row.get(3)?;
    Ok(PrivateMessage {
        from_user: row.get(0)?,
        to_user: row.get(1)?,
        message: row.get(2)?,
        date_sent: row_timestamp(3, ms)?,
    })
}

fn row_timestamp(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            Box::new(StoreError::InvalidTimestamp(ms)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn append_then_read_back() {
        let (mut db, _dir) = test_db();

        let sent = db.append_group_message("general", "alice", "hi").unwrap();

        let history = db.room_history("general", 200).unwrap();
        assert_eq!(history, vec![sent]);
    }

    #[test]
    fn history_is_ascending_and_newest_bounded() {
        let (mut db, _dir) = test_db();

        for i in 0..10 {
            db.append_group_message("general", "alice", &format!("msg {i}"))
                .unwrap();
        }

        let history = db.room_history("general", 4).unwrap();
        assert_eq!(history.len(), 4);
        // The newest four, oldest-first.
        let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["msg 6", "msg 7", "msg 8", "msg 9"]);
        assert!(history.windows(2).all(|w| w[0].date_sent <= w[1].date_sent));
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let (mut db, _dir) = test_db();

        // Appends within the same millisecond share a date_sent; the insertion
        // id must keep them in send order.
        for i in 0..5 {
            db.append_group_message("general", "alice", &format!("burst {i}"))
                .unwrap();
        }

        let history = db.room_history("general", 200).unwrap();
        let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(
            bodies,
            vec!["burst 0", "burst 1", "burst 2", "burst 3", "burst 4"]
        );
    }

    #[test]
    fn empty_room_returns_empty_vec() {
        let (db, _dir) = test_db();
        assert!(db.room_history("deserted", 200).unwrap().is_empty());
    }

    #[test]
    fn room_histories_do_not_bleed() {
        let (mut db, _dir) = test_db();

        db.append_group_message("general", "alice", "in general")
            .unwrap();
        db.append_group_message("random", "bob", "in random").unwrap();

        let history = db.room_history("general", 200).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "in general");
    }

    #[test]
    fn private_history_is_pair_symmetric() {
        let (mut db, _dir) = test_db();

        db.append_private_message("alice", "bob", "hey bob").unwrap();
        db.append_private_message("bob", "alice", "hey alice").unwrap();
        db.append_private_message("alice", "carol", "unrelated").unwrap();

        let ab = db.private_history("alice", "bob", 200).unwrap();
        let ba = db.private_history("bob", "alice", 200).unwrap();

        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 2);
        assert_eq!(ab[0].message, "hey bob");
        assert_eq!(ab[1].message, "hey alice");
    }

    #[test]
    fn appended_timestamps_are_monotonic() {
        let (mut db, _dir) = test_db();

        let mut prev = None;
        for i in 0..20 {
            let msg = db
                .append_private_message("alice", "bob", &format!("m{i}"))
                .unwrap();
            if let Some(prev) = prev {
                assert!(msg.date_sent >= prev);
            }
            prev = Some(msg.date_sent);
        }
    }
}
