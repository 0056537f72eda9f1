//! # parley-store
//!
//! SQLite persistence for chat history.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed append/query helpers for group
//! and private messages, plus an async [`MessageStore`] facade that runs
//! every operation on the tokio blocking pool under a bounded timeout.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod store;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use store::MessageStore;
