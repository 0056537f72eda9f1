//! Event dispatch: the routing core.
//!
//! [`EventRouter`] owns the presence registry, room registry, typing tracker
//! and message store, and turns each inbound [`ClientEvent`] into its
//! persistence action and outbound deliveries.  Each connection's read loop
//! calls [`EventRouter::dispatch`] inline, so one client's events are handled
//! in the order they were sent; events from different connections interleave
//! arbitrarily.
//!
//! Failure policy: a malformed or incomplete event is dropped with a debug
//! log, a failed persistence call is logged and swallowed (nothing is
//! broadcast for a message that is not durable), and no failure ever
//! terminates a connection's loop or the process.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use parley_shared::{ClientEvent, RoomName, ServerEvent, TypingScope, Username};
use parley_store::MessageStore;

use crate::connection::Connection;
use crate::presence::PresenceRegistry;
use crate::rooms::RoomRegistry;
use crate::typing::{TypingKey, TypingTracker};

/// Dispatches inbound client events to the registries and the store.
#[derive(Clone)]
pub struct EventRouter {
    presence: PresenceRegistry,
    rooms: RoomRegistry,
    typing: TypingTracker,
    store: MessageStore,
}

impl EventRouter {
    pub fn new(store: MessageStore, typing_ttl: Duration) -> Self {
        Self {
            presence: PresenceRegistry::new(),
            rooms: RoomRegistry::new(),
            typing: TypingTracker::new(typing_ttl),
            store,
        }
    }

    /// Handle one inbound event for `conn`.
    pub async fn dispatch(&self, conn: &mut Connection, event: ClientEvent) {
        match event {
            ClientEvent::RegisterUser(username) => self.register_user(conn, username).await,
            ClientEvent::JoinRoom { room, username } => {
                self.join_room(conn, room, username).await
            }
            ClientEvent::LeaveRoom => self.leave_room(conn).await,
            ClientEvent::Typing { room, username } => {
                self.typing_room(conn, room, username).await
            }
            ClientEvent::StopTyping { room } => self.stop_typing_room(conn, room).await,
            ClientEvent::TypingPrivate { from_user, to_user } => {
                self.typing_private(conn, from_user, to_user).await
            }
            ClientEvent::StopTypingPrivate { from_user, to_user } => {
                self.stop_typing_private(conn, from_user, to_user).await
            }
            ClientEvent::SendMessage {
                room,
                username,
                message,
            } => self.send_message(conn, room, username, message).await,
            ClientEvent::SendPrivate {
                from_user,
                to_user,
                message,
            } => self.send_private(conn, from_user, to_user, message).await,
        }
    }

    /// Tear down a connection's registry state after its socket closed.
    ///
    /// Removes it from its room (announcing the departure, symmetric to the
    /// join notice) and releases its presence mapping under the connection-id
    /// guard, so a stale disconnect never evicts a newer registration.
    pub async fn disconnect(&self, conn: &mut Connection) {
        if let Some(room) = conn.room.take() {
            self.rooms.leave(conn.id, &room).await;
            if let Some(username) = &conn.username {
                let notice = ServerEvent::SystemMessage(format!("{username} left {room}"));
                self.rooms.broadcast(&room, &notice, None).await;
            }
        }

        if let Some(username) = conn.username.take() {
            self.presence.unregister(conn.id, &username).await;
            info!(conn = %conn.id, user = %username, "User disconnected");
        } else {
            info!(conn = %conn.id, "Connection closed");
        }
    }

    /// Expire overdue typing indicators and emit the stop signal the client
    /// never got to send.  Called periodically by the sweeper task.
    pub async fn sweep_typing(&self) {
        for (key, origin) in self.typing.collect_expired(Instant::now()).await {
            match key {
                TypingKey::Room(room) => {
                    let event = ServerEvent::StopTyping {
                        scope: TypingScope::Room,
                        room: Some(room.clone()),
                        from: None,
                    };
                    self.rooms.broadcast(&room, &event, Some(origin)).await;
                }
                TypingKey::Private { from, to } => {
                    if let Some(target) = self.presence.lookup(&to).await {
                        target.push(&ServerEvent::StopTyping {
                            scope: TypingScope::Private,
                            room: None,
                            from: Some(from),
                        });
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    async fn register_user(&self, conn: &mut Connection, username: Username) {
        if username.is_empty() {
            debug!(conn = %conn.id, "Dropping registerUser with empty username");
            return;
        }

        self.rebind(conn, username.clone()).await;
        self.presence
            .register(username.clone(), conn.handle.clone())
            .await;
        info!(conn = %conn.id, user = %username, "User registered");
    }

    /// Bind `username` as this connection's identity.  If the connection had
    /// bound a different name, that name's registry entry is released first
    /// (guarded), so disconnect cleanup always matches the live binding.
    async fn rebind(&self, conn: &mut Connection, username: Username) {
        if let Some(old) = conn.username.take() {
            if old != username {
                self.presence.unregister(conn.id, &old).await;
            }
        }
        conn.username = Some(username);
    }

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    async fn join_room(&self, conn: &mut Connection, room: RoomName, username: Username) {
        if room.is_empty() || username.is_empty() {
            debug!(conn = %conn.id, "Dropping joinRoom with missing fields");
            return;
        }

        let prev = conn.room.take();
        self.rooms
            .join(conn.handle.clone(), prev.as_ref(), room.clone())
            .await;

        // Announce the implicit leave before the join so observers see the
        // two transitions in order.
        if let Some(prev) = prev.filter(|prev| *prev != room) {
            let notice = ServerEvent::SystemMessage(format!("{username} left {prev}"));
            self.rooms.broadcast(&prev, &notice, None).await;
        }

        let notice = ServerEvent::SystemMessage(format!("{username} joined {room}"));
        self.rooms.broadcast(&room, &notice, Some(conn.id)).await;

        info!(conn = %conn.id, user = %username, room = %room, "User joined room");
        conn.room = Some(room);
        self.rebind(conn, username).await;
    }

    async fn leave_room(&self, conn: &mut Connection) {
        let Some(room) = conn.room.take() else {
            debug!(conn = %conn.id, "Ignoring leaveRoom: connection is not in a room");
            return;
        };

        self.rooms.leave(conn.id, &room).await;

        if let Some(username) = &conn.username {
            let notice = ServerEvent::SystemMessage(format!("{username} left {room}"));
            self.rooms.broadcast(&room, &notice, None).await;
            info!(conn = %conn.id, user = %username, room = %room, "User left room");
        }
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    async fn send_message(
        &self,
        conn: &Connection,
        room: RoomName,
        username: Username,
        message: String,
    ) {
        if room.is_empty() || username.is_empty() || message.is_empty() {
            debug!(conn = %conn.id, "Dropping sendMessage with missing fields");
            return;
        }

        // Write-before-broadcast: no member may observe a message that is
        // not durable yet.
        let record = match self
            .store
            .append_group_message(room.as_str(), username.as_str(), &message)
            .await
        {
            Ok(record) => record,
            Err(error) => {
                error!(conn = %conn.id, room = %room, %error, "Failed to persist room message");
                return;
            }
        };

        let event = ServerEvent::ReceiveMessage {
            from_user: username,
            room: room.clone(),
            message,
            date_sent: record.date_sent,
        };
        // Every member, sender included: the fan-out is the confirmation.
        self.rooms.broadcast(&room, &event, None).await;
    }

    async fn send_private(
        &self,
        conn: &Connection,
        from_user: Username,
        to_user: Username,
        message: String,
    ) {
        if from_user.is_empty() || to_user.is_empty() || message.is_empty() {
            debug!(conn = %conn.id, "Dropping sendPrivate with missing fields");
            return;
        }

        let record = match self
            .store
            .append_private_message(from_user.as_str(), to_user.as_str(), &message)
            .await
        {
            Ok(record) => record,
            Err(error) => {
                error!(conn = %conn.id, %error, "Failed to persist private message");
                return;
            }
        };

        let event = ServerEvent::ReceivePrivate {
            from_user,
            to_user: to_user.clone(),
            message,
            date_sent: record.date_sent,
        };

        match self.presence.lookup(&to_user).await {
            Some(target) => {
                if !target.push(&event) {
                    warn!(
                        conn = %target.conn_id,
                        user = %to_user,
                        "Dropping private delivery for closed connection queue"
                    );
                }
            }
            None => {
                // Routing miss, not an error: the message is durable and the
                // recipient will find it in history.
                debug!(user = %to_user, "Private recipient offline; skipping live delivery");
            }
        }

        // The sender always gets the confirmation copy, online recipient or
        // not.
        conn.handle.push(&event);
    }

    // ------------------------------------------------------------------
    // Typing indicators
    // ------------------------------------------------------------------

    async fn typing_room(&self, conn: &Connection, room: RoomName, username: Username) {
        if room.is_empty() || username.is_empty() {
            debug!(conn = %conn.id, "Dropping typing with missing fields");
            return;
        }

        self.typing
            .begin(TypingKey::Room(room.clone()), conn.id)
            .await;

        let event = ServerEvent::Typing {
            scope: TypingScope::Room,
            room: Some(room.clone()),
            from: username,
        };
        self.rooms.broadcast(&room, &event, Some(conn.id)).await;
    }

    async fn stop_typing_room(&self, conn: &Connection, room: RoomName) {
        if room.is_empty() {
            debug!(conn = %conn.id, "Dropping stopTyping with missing room");
            return;
        }

        self.typing.clear(&TypingKey::Room(room.clone())).await;

        let event = ServerEvent::StopTyping {
            scope: TypingScope::Room,
            room: Some(room.clone()),
            from: None,
        };
        self.rooms.broadcast(&room, &event, Some(conn.id)).await;
    }

    async fn typing_private(&self, conn: &Connection, from_user: Username, to_user: Username) {
        if from_user.is_empty() || to_user.is_empty() {
            debug!(conn = %conn.id, "Dropping typingPrivate with missing fields");
            return;
        }

        self.typing
            .begin(
                TypingKey::Private {
                    from: from_user.clone(),
                    to: to_user.clone(),
                },
                conn.id,
            )
            .await;

        if let Some(target) = self.presence.lookup(&to_user).await {
            target.push(&ServerEvent::Typing {
                scope: TypingScope::Private,
                room: None,
                from: from_user,
            });
        }
    }

    async fn stop_typing_private(
        &self,
        conn: &Connection,
        from_user: Username,
        to_user: Username,
    ) {
        if from_user.is_empty() || to_user.is_empty() {
            debug!(conn = %conn.id, "Dropping stopTypingPrivate with missing fields");
            return;
        }

        self.typing
            .clear(&TypingKey::Private {
                from: from_user.clone(),
                to: to_user.clone(),
            })
            .await;

        if let Some(target) = self.presence.lookup(&to_user).await {
            target.push(&ServerEvent::StopTyping {
                scope: TypingScope::Private,
                room: None,
                from: Some(from_user),
            });
        }
    }
}
