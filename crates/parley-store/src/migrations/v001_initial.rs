//! v001 -- Initial schema creation.
//!
//! Creates the two message collections: `group_messages` keyed by
//! `(room, date_sent)` and `private_messages` keyed by
//! `(from_user, to_user, date_sent)`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Group messages (room chat)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_messages (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    room      TEXT NOT NULL,
    from_user TEXT NOT NULL,
    message   TEXT NOT NULL,
    date_sent INTEGER NOT NULL               -- unix epoch millis, server-assigned
);

CREATE INDEX IF NOT EXISTS idx_group_messages_room_ts
    ON group_messages(room, date_sent);

-- ----------------------------------------------------------------
-- Private messages (one-to-one chat)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS private_messages (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    from_user TEXT NOT NULL,
    to_user   TEXT NOT NULL,
    message   TEXT NOT NULL,
    date_sent INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_private_messages_pair_ts
    ON private_messages(from_user, to_user, date_sent);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
