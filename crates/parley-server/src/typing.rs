//! Server-side typing indicator tracking.
//!
//! The client owns the debounce timer and normally sends an explicit
//! `stopTyping`; the server relays both signals as-is.  This tracker adds a
//! safety net on top of the relay: every live indicator carries a deadline,
//! and a background sweep emits the stop on the client's behalf if neither a
//! refresh nor an explicit stop arrives in time (e.g. the sender disconnected
//! mid-keystroke).  Receivers treat repeated `typing` signals as idempotent,
//! so a duplicate stop or refresh is harmless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use parley_shared::{RoomName, Username};

use crate::connection::ConnId;

/// Scope of one live typing indicator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypingKey {
    /// Someone is typing in a room.  The room is the whole key: the indicator
    /// shows one "is typing" line per room, refreshed by whoever typed last.
    Room(RoomName),
    /// A directed one-to-one indicator.
    Private { from: Username, to: Username },
}

#[derive(Debug, Clone)]
struct TypingEntry {
    /// Connection that started (or last refreshed) the indicator; excluded
    /// from the sweep's room broadcast, same as the explicit path.
    origin: ConnId,
    deadline: Instant,
}

/// Tracks live typing indicators and their expiry deadlines.
#[derive(Clone)]
pub struct TypingTracker {
    entries: Arc<Mutex<HashMap<TypingKey, TypingEntry>>>,
    ttl: Duration,
}

impl TypingTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Mark `key` as typing.  Returns `true` on an Idle -> Typing transition,
    /// `false` when an existing indicator was refreshed.
    pub async fn begin(&self, key: TypingKey, origin: ConnId) -> bool {
        let mut entries = self.entries.lock().await;
        let deadline = Instant::now() + self.ttl;
        entries
            .insert(key, TypingEntry { origin, deadline })
            .is_none()
    }

    /// Explicitly clear `key`.  Returns whether an indicator was live.
    pub async fn clear(&self, key: &TypingKey) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Remove and return every indicator whose deadline has passed at `now`,
    /// along with its originating connection.
    pub async fn collect_expired(&self, now: Instant) -> Vec<(TypingKey, ConnId)> {
        let mut entries = self.entries.lock().await;
        let expired: Vec<TypingKey> = entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut collected = Vec::with_capacity(expired.len());
        for key in expired {
            if let Some(entry) = entries.remove(&key) {
                collected.push((key, entry.origin));
            }
        }

        if !collected.is_empty() {
            debug!(expired = collected.len(), "Expired typing indicators");
        }
        collected
    }

    /// Number of currently live indicators.
    #[allow(dead_code)]
    pub async fn active_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}
