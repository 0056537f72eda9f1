//! Per-connection state and the outbound push handle.
//!
//! Each WebSocket gets a [`Connection`] owned by its read loop, plus a
//! cloneable [`ClientHandle`] that the registries keep so any task can queue
//! frames for that socket.  Pushing is non-blocking fire-and-forget: a push
//! to a closed queue reports failure but never blocks or panics.

use tokio::sync::mpsc;
use uuid::Uuid;

use parley_shared::{RoomName, ServerEvent, Username};

/// Transport-assigned identifier for one live client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cloneable sender half of one connection's outbound frame queue.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub conn_id: ConnId,
    tx: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    pub fn new(conn_id: ConnId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { conn_id, tx }
    }

    /// Queue one pre-serialized frame.  Returns `false` if the connection's
    /// writer has already gone away.
    pub fn push_raw(&self, frame: String) -> bool {
        self.tx.send(frame).is_ok()
    }

    /// Serialize and queue one event.
    pub fn push(&self, event: &ServerEvent) -> bool {
        match event.to_json() {
            Ok(frame) => self.push_raw(frame),
            Err(error) => {
                tracing::warn!(%error, "Failed to serialize outbound event");
                false
            }
        }
    }
}

/// Mutable session state owned by one connection's read loop.
///
/// `username` is bound by `registerUser` (and by `joinRoom`); `room` is the
/// single room this connection currently occupies, if any.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnId,
    pub handle: ClientHandle,
    pub username: Option<Username>,
    pub room: Option<RoomName>,
}

impl Connection {
    pub fn new(id: ConnId, handle: ClientHandle) -> Self {
        Self {
            id,
            handle,
            username: None,
            room: None,
        }
    }
}
