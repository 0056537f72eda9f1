//! # parley-server
//!
//! WebSocket chat relay.
//!
//! This binary provides:
//! - **Event routing** over WebSocket: rooms with join/leave notices,
//!   direct user-to-user messages, and typing indicators for both
//! - **SQLite-backed history** so messages survive restarts and late joiners
//!   can catch up
//! - **REST API** (axum) for health checks and history queries

mod api;
mod config;
mod connection;
mod error;
mod presence;
mod rooms;
mod router;
mod typing;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use parley_shared::constants::TYPING_SWEEP_INTERVAL_MS;
use parley_store::MessageStore;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::router::EventRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,parley_server=debug")),
        )
        .init();

    info!("Starting Parley chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Message store (creates the database directory and schema if missing)
    let store = MessageStore::open(config.database_path.clone(), config.store_timeout).await?;
    info!(path = %config.database_path.display(), "Message store ready");

    // Event router owns presence, rooms, and typing state
    let router = EventRouter::new(store.clone(), config.typing_ttl);

    // Application state for the HTTP API and WebSocket handlers
    let app_state = AppState {
        router: router.clone(),
        store,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Typing sweeper: emits stopTyping for clients that went silent without
    // sending one (closed laptop, dropped connection)
    let sweeper = router.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TYPING_SWEEP_INTERVAL_MS));
        loop {
            interval.tick().await;
            sweeper.sweep_typing().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    let http_addr = config.http_addr;
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
