//! Async facade over the synchronous [`Database`].
//!
//! Every operation runs on the tokio blocking pool and is bounded by a
//! timeout, so a stalled store degrades to [`StoreError::Timeout`] instead of
//! wedging the calling task's event loop.  The handle is cheap to clone; all
//! clones share one connection.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{GroupMessage, PrivateMessage};

/// Cloneable async handle to the message store.
#[derive(Clone)]
pub struct MessageStore {
    db: Arc<Mutex<Database>>,
    timeout: Duration,
}

impl MessageStore {
    /// Open (or create) the store at `path`, creating parent directories as
    /// needed.  `timeout` bounds every subsequent operation.
    pub async fn open(path: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let db = task::spawn_blocking(move || Database::open_at(&path))
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))??;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            timeout,
        })
    }

    /// Append a room message; the returned record carries the assigned
    /// timestamp.
    pub async fn append_group_message(
        &self,
        room: &str,
        from_user: &str,
        message: &str,
    ) -> Result<GroupMessage> {
        let (room, from_user, message) =
            (room.to_owned(), from_user.to_owned(), message.to_owned());
        self.run(move |db| db.append_group_message(&room, &from_user, &message))
            .await
    }

    /// Append a private message; the returned record carries the assigned
    /// timestamp.
    pub async fn append_private_message(
        &self,
        from_user: &str,
        to_user: &str,
        message: &str,
    ) -> Result<PrivateMessage> {
        let (from_user, to_user, message) =
            (from_user.to_owned(), to_user.to_owned(), message.to_owned());
        self.run(move |db| db.append_private_message(&from_user, &to_user, &message))
            .await
    }

    /// The newest `limit` messages for a room, oldest-first.
    pub async fn room_history(&self, room: &str, limit: u32) -> Result<Vec<GroupMessage>> {
        let room = room.to_owned();
        self.run(move |db| db.room_history(&room, limit)).await
    }

    /// The newest `limit` messages between two users, oldest-first and
    /// symmetric in its arguments.
    pub async fn private_history(
        &self,
        user_a: &str,
        user_b: &str,
        limit: u32,
    ) -> Result<Vec<PrivateMessage>> {
        let (user_a, user_b) = (user_a.to_owned(), user_b.to_owned());
        self.run(move |db| db.private_history(&user_a, &user_b, limit))
            .await
    }

    /// Run one database operation on the blocking pool under the configured
    /// timeout.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        let worker = task::spawn_blocking(move || {
            let mut db = db.lock().map_err(|_| StoreError::Poisoned)?;
            op(&mut db)
        });

        match tokio::time::timeout(self.timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(StoreError::Worker(join_error.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    async fn test_store() -> (MessageStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::open(dir.path().join("test.db"), TEST_TIMEOUT)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn async_round_trip() {
        let (store, _dir) = test_store().await;

        let sent = store
            .append_group_message("general", "alice", "hi")
            .await
            .unwrap();
        let history = store.room_history("general", 200).await.unwrap();
        assert_eq!(history, vec![sent]);
    }

    #[tokio::test]
    async fn private_round_trip_symmetric() {
        let (store, _dir) = test_store().await;

        store
            .append_private_message("alice", "bob", "psst")
            .await
            .unwrap();

        let ab = store.private_history("alice", "bob", 200).await.unwrap();
        let ba = store.private_history("bob", "alice", 200).await.unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 1);
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("parley").join("test.db");

        let store = MessageStore::open(&nested, TEST_TIMEOUT).await.unwrap();
        assert!(store.room_history("general", 200).await.unwrap().is_empty());
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn stalled_store_degrades_to_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = MessageStore::open(dir.path().join("test.db"), Duration::from_millis(50))
            .await
            .unwrap();

        // Hold the database lock from another worker so the append cannot
        // make progress before its timeout fires.
        let db = store.db.clone();
        let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();
        let hold = task::spawn_blocking(move || {
            let _guard = db.lock().unwrap();
            let _ = locked_tx.send(());
            std::thread::sleep(Duration::from_millis(500));
        });
        locked_rx.await.unwrap();

        let err = store
            .append_group_message("general", "alice", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));

        hold.await.unwrap();
    }
}
