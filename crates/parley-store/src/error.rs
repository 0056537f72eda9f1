use std::time::Duration;

use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A persisted timestamp does not map to a valid instant.
    #[error("Invalid stored timestamp: {0} ms")]
    InvalidTimestamp(i64),

    /// The operation did not complete within the configured bound.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking worker running the operation failed.
    #[error("Store worker failed: {0}")]
    Worker(String),

    /// A previous operation panicked while holding the database lock.
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
