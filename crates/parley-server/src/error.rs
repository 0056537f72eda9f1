use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use parley_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Response bodies stay generic: store internals are logged, not leaked.
        let (status, message) = match &self {
            ServerError::Store(StoreError::Timeout(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Store temporarily unavailable".to_string(),
            ),
            ServerError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        tracing::error!(error = %self, "Request failed");

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
