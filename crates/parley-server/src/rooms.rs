//! Room membership and group broadcast.
//!
//! Rooms are ad-hoc: any name is valid, there is no creation step, and a room
//! exists exactly as long as it has members.  A connection occupies at most
//! one room; moving between rooms is a single compound operation so no
//! half-moved state is ever observable.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use parley_shared::{RoomName, ServerEvent};

use crate::connection::{ClientHandle, ConnId};

/// Tracks which connections currently occupy which room.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<RoomName, HashMap<ConnId, ClientHandle>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a connection to `room`, removing it from `prev_room` first.
    ///
    /// Both steps happen under one lock acquisition so concurrent broadcasts
    /// see the connection in exactly one room.
    pub async fn join(&self, handle: ClientHandle, prev_room: Option<&RoomName>, room: RoomName) {
        let mut rooms = self.rooms.lock().await;

        if let Some(prev) = prev_room {
            if let Some(members) = rooms.get_mut(prev) {
                members.remove(&handle.conn_id);
                if members.is_empty() {
                    rooms.remove(prev);
                }
            }
        }

        let conn_id = handle.conn_id;
        let members = rooms.entry(room.clone()).or_default();
        members.insert(conn_id, handle);

        debug!(
            room = %room,
            conn = %conn_id,
            members = members.len(),
            "Connection joined room"
        );
    }

    /// Remove a connection from `room`.  Returns whether it was a member.
    /// Empty rooms are dropped.
    pub async fn leave(&self, conn_id: ConnId, room: &RoomName) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };

        let removed = members.remove(&conn_id).is_some();
        if members.is_empty() {
            rooms.remove(room);
        }

        if removed {
            debug!(room = %room, conn = %conn_id, "Connection left room");
        }
        removed
    }

    /// Snapshot of a room's current members.
    ///
    /// Broadcast iterates this snapshot, so a member joining or leaving
    /// mid-delivery cannot disturb the remaining pushes.
    pub async fn members(&self, room: &RoomName) -> Vec<ClientHandle> {
        self.rooms
            .lock()
            .await
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver `event` to every member of `room`, except the optional
    /// excluded connection.
    ///
    /// The event is serialized once.  A push to a closed queue is logged and
    /// skipped; it never aborts delivery to the remaining members.
    pub async fn broadcast(&self, room: &RoomName, event: &ServerEvent, exclude: Option<ConnId>) {
        let frame = match event.to_json() {
            Ok(frame) => frame,
            Err(error) => {
                warn!(room = %room, %error, "Failed to serialize broadcast event");
                return;
            }
        };

        for member in self.members(room).await {
            if Some(member.conn_id) == exclude {
                continue;
            }
            if !member.push_raw(frame.clone()) {
                warn!(
                    room = %room,
                    conn = %member.conn_id,
                    "Dropping broadcast for closed connection queue"
                );
            }
        }
    }

    /// Number of members currently in `room`.
    #[allow(dead_code)]
    pub async fn member_count(&self, room: &RoomName) -> usize {
        self.rooms
            .lock()
            .await
            .get(room)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_handle() -> (ClientHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientHandle::new(ConnId::new(), tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_join_leave_membership() {
        let rooms = RoomRegistry::new();
        let general = RoomName::from("general");
        let (handle, _rx) = test_handle();

        rooms.join(handle.clone(), None, general.clone()).await;
        assert_eq!(rooms.member_count(&general).await, 1);

        assert!(rooms.leave(handle.conn_id, &general).await);
        assert_eq!(rooms.member_count(&general).await, 0);

        // Second leave is a no-op.
        assert!(!rooms.leave(handle.conn_id, &general).await);
    }

    #[tokio::test]
    async fn test_join_moves_between_rooms_atomically() {
        let rooms = RoomRegistry::new();
        let general = RoomName::from("general");
        let random = RoomName::from("random");
        let (handle, _rx) = test_handle();

        rooms.join(handle.clone(), None, general.clone()).await;
        rooms
            .join(handle.clone(), Some(&general), random.clone())
            .await;

        assert_eq!(rooms.member_count(&general).await, 0);
        assert_eq!(rooms.member_count(&random).await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_members() {
        let rooms = RoomRegistry::new();
        let general = RoomName::from("general");
        let (a, mut a_rx) = test_handle();
        let (b, mut b_rx) = test_handle();

        rooms.join(a, None, general.clone()).await;
        rooms.join(b, None, general.clone()).await;

        let event = ServerEvent::SystemMessage("hello".into());
        rooms.broadcast(&general, &event, None).await;

        assert_eq!(drain(&mut a_rx).len(), 1);
        assert_eq!(drain(&mut b_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_one_connection() {
        let rooms = RoomRegistry::new();
        let general = RoomName::from("general");
        let (a, mut a_rx) = test_handle();
        let (b, mut b_rx) = test_handle();
        let excluded = a.conn_id;

        rooms.join(a, None, general.clone()).await;
        rooms.join(b, None, general.clone()).await;

        let event = ServerEvent::SystemMessage("psst".into());
        rooms.broadcast(&general, &event, Some(excluded)).await;

        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_survives_closed_member_queue() {
        let rooms = RoomRegistry::new();
        let general = RoomName::from("general");
        let (dead, dead_rx) = test_handle();
        let (live, mut live_rx) = test_handle();

        rooms.join(dead, None, general.clone()).await;
        rooms.join(live, None, general.clone()).await;

        // Simulate a writer that went away without leaving the room yet.
        drop(dead_rx);

        let event = ServerEvent::SystemMessage("still here".into());
        rooms.broadcast(&general, &event, None).await;

        assert_eq!(drain(&mut live_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_unknown_room_is_noop() {
        let rooms = RoomRegistry::new();
        let event = ServerEvent::SystemMessage("anyone?".into());
        rooms.broadcast(&RoomName::from("void"), &event, None).await;
    }
}
