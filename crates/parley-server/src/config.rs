//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.  Invalid values log a warning and
//! fall back to the default; they never abort startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use parley_shared::constants::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_HTTP_PORT, DEFAULT_STORE_TIMEOUT_MS, DEFAULT_TYPING_TTL_MS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP/WebSocket (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DATABASE_PATH`
    /// Default: `./parley.db`
    pub database_path: PathBuf,

    /// Default number of history entries returned per query.
    /// Env: `HISTORY_LIMIT`
    /// Default: `200`
    pub history_limit: u32,

    /// How long a typing indicator stays live without a refresh before the
    /// server emits `stopTyping` on the client's behalf.
    /// Env: `TYPING_TTL_MS`
    /// Default: `1800`
    pub typing_ttl: Duration,

    /// Bound on each persistence call.
    /// Env: `STORE_TIMEOUT_MS`
    /// Default: `5000`
    pub store_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./parley.db"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            typing_ttl: Duration::from_millis(DEFAULT_TYPING_TTL_MS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("HISTORY_LIMIT") {
            if let Ok(n) = val.parse::<u32>() {
                config.history_limit = n;
            } else {
                tracing::warn!(value = %val, "Invalid HISTORY_LIMIT, using default");
            }
        }

        if let Ok(val) = std::env::var("TYPING_TTL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.typing_ttl = Duration::from_millis(ms);
            } else {
                tracing::warn!(value = %val, "Invalid TYPING_TTL_MS, using default");
            }
        }

        if let Ok(val) = std::env::var("STORE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.store_timeout = Duration::from_millis(ms);
            } else {
                tracing::warn!(value = %val, "Invalid STORE_TIMEOUT_MS, using default");
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
