//! Live username-to-connection mapping.
//!
//! Single source of truth for "who can receive a direct push right now".
//! A username maps to at most one connection; registering again from a new
//! session supersedes the old mapping (re-authentication, not an error).
//! Removal is guarded by connection id so a stale connection's disconnect can
//! never evict a newer registration for the same name.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use parley_shared::Username;

use crate::connection::{ClientHandle, ConnId};

/// Tracks which connection, if any, each username is reachable on.
#[derive(Clone)]
pub struct PresenceRegistry {
    users: Arc<Mutex<HashMap<Username, ClientHandle>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bind `username` to `handle`, superseding any previous mapping.
    pub async fn register(&self, username: Username, handle: ClientHandle) {
        let mut users = self.users.lock().await;
        let conn = handle.conn_id;
        if let Some(prev) = users.insert(username.clone(), handle) {
            debug!(
                user = %username,
                old_conn = %prev.conn_id,
                new_conn = %conn,
                "Superseded previous registration"
            );
        } else {
            debug!(user = %username, conn = %conn, "Registered user");
        }
    }

    /// The connection currently bound to `username`, if any.
    pub async fn lookup(&self, username: &Username) -> Option<ClientHandle> {
        self.users.lock().await.get(username).cloned()
    }

    /// Remove the mapping for `username` only if it currently points at
    /// exactly `conn_id`.  Returns whether a mapping was removed.
    ///
    /// The guard covers the re-registration race: connection A binds "alice",
    /// connection B re-binds "alice", then A disconnects -- A's cleanup must
    /// not evict B's mapping.
    pub async fn unregister(&self, conn_id: ConnId, username: &Username) -> bool {
        let mut users = self.users.lock().await;
        match users.get(username) {
            Some(handle) if handle.conn_id == conn_id => {
                users.remove(username);
                debug!(user = %username, conn = %conn_id, "Unregistered user");
                true
            }
            Some(_) => {
                debug!(
                    user = %username,
                    conn = %conn_id,
                    "Skipped unregister: username re-bound to a newer connection"
                );
                false
            }
            None => false,
        }
    }

    /// Number of currently registered users.
    #[allow(dead_code)]
    pub async fn online_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_handle() -> ClientHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        ClientHandle::new(ConnId::new(), tx)
    }

    #[tokio::test]
    async fn test_register_lookup() {
        let registry = PresenceRegistry::new();
        let alice = Username::from("alice");
        let handle = test_handle();

        registry.register(alice.clone(), handle.clone()).await;

        let found = registry.lookup(&alice).await.unwrap();
        assert_eq!(found.conn_id, handle.conn_id);
        assert!(registry.lookup(&Username::from("bob")).await.is_none());
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = PresenceRegistry::new();
        let alice = Username::from("alice");
        let first = test_handle();
        let second = test_handle();

        registry.register(alice.clone(), first).await;
        registry.register(alice.clone(), second.clone()).await;

        let found = registry.lookup(&alice).await.unwrap();
        assert_eq!(found.conn_id, second.conn_id);
        assert_eq!(registry.online_count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_own_mapping() {
        let registry = PresenceRegistry::new();
        let alice = Username::from("alice");
        let handle = test_handle();

        registry.register(alice.clone(), handle.clone()).await;
        assert!(registry.unregister(handle.conn_id, &alice).await);
        assert!(registry.lookup(&alice).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_disconnect_does_not_evict_newer_registration() {
        let registry = PresenceRegistry::new();
        let alice = Username::from("alice");
        let conn_x = test_handle();
        let conn_y = test_handle();

        // X registers "alice", Y re-registers "alice", then X disconnects.
        registry.register(alice.clone(), conn_x.clone()).await;
        registry.register(alice.clone(), conn_y.clone()).await;

        assert!(!registry.unregister(conn_x.conn_id, &alice).await);

        // Y must still be reachable.
        let found = registry.lookup(&alice).await.unwrap();
        assert_eq!(found.conn_id, conn_y.conn_id);
    }

    #[tokio::test]
    async fn test_unregister_unknown_user_is_noop() {
        let registry = PresenceRegistry::new();
        assert!(
            !registry
                .unregister(ConnId::new(), &Username::from("ghost"))
                .await
        );
    }
}
