//! HTTP surface: health probe, history queries, and the WebSocket mount.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_shared::constants::MAX_HISTORY_LIMIT;
use parley_store::{GroupMessage, MessageStore, PrivateMessage};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::router::EventRouter;
use crate::ws;

/// Shared state handed to every HTTP and WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    pub router: EventRouter,
    pub store: MessageStore,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    // History is public read-only data, the same as over the socket, so the
    // CORS policy is wide open for reads.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .route("/api/messages/:room", get(room_history))
        .route("/api/private/:user_a/:user_b", get(private_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the task is cancelled.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

/// Requested window size, defaulted and clamped to the hard ceiling.
fn effective_limit(requested: Option<u32>, default: u32) -> u32 {
    requested.unwrap_or(default).min(MAX_HISTORY_LIMIT)
}

/// GET /api/messages/:room returns the room's recent history, oldest-first.
async fn room_history(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<GroupMessage>>, ServerError> {
    let limit = effective_limit(query.limit, state.config.history_limit);
    let messages = state.store.room_history(&room, limit).await?;
    Ok(Json(messages))
}

/// GET /api/private/:user_a/:user_b returns the conversation between two
/// users, oldest-first. The order of the two names does not matter.
async fn private_history(
    State(state): State<AppState>,
    Path((user_a, user_b)): Path<(String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PrivateMessage>>, ServerError> {
    let limit = effective_limit(query.limit, state.config.history_limit);
    let messages = state.store.private_history(&user_a, &user_b, limit).await?;
    Ok(Json(messages))
}
