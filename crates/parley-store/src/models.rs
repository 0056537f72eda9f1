//! Persisted message records.
//!
//! Both structs serialize to exactly the payload shapes the wire protocol and
//! the history REST endpoints expose, so they can be handed to clients as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message posted to a room, fanned out to every member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMessage {
    /// Username of the sender.
    pub from_user: String,
    /// Room the message was posted to.
    pub room: String,
    /// Message body.
    pub message: String,
    /// Server-assigned send timestamp.
    pub date_sent: DateTime<Utc>,
}

/// A direct message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateMessage {
    /// Username of the sender.
    pub from_user: String,
    /// Username of the recipient.
    pub to_user: String,
    /// Message body.
    pub message: String,
    /// Server-assigned send timestamp.
    pub date_sent: DateTime<Utc>,
}
