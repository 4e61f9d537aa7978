//! Liveness endpoint.
//!
//! Always `200` while the process serves requests. A missing messaging key
//! shows up as `tokens: false` rather than a failed check, since replies
//! still work without it.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Channel tokens are scoped to.
    pub channel: String,
    /// Whether token requests can succeed.
    pub tokens: bool,
    /// Name of the completion backend behind `/api/reply`.
    pub reply_backend: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        channel: state.tokens.channel().to_string(),
        tokens: state.tokens.is_ready(),
        reply_backend: state.replies.backend_name().to_string(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
