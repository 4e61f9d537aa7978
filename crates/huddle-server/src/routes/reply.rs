//! AI reply proxy endpoint.
//!
//! Always answers `200 {reply}` once the input is valid. Upstream trouble
//! shows up as fallback text, never as a status code.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServerError;
use crate::state::AppState;

/// Request body for the reply endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
}

/// Response from the reply endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub reply: String,
}

/// Pull a usable message out of an arbitrary JSON body.
///
/// The body is taken as a [`Value`] rather than a typed struct so that a
/// missing field, a non-string field and a blank string each get their own
/// 400 message.
fn validate_message(body: &Value) -> Result<&str, ServerError> {
    match body.get("message") {
        None | Some(Value::Null) => Err(ServerError::BadRequest("Message is required".to_string())),
        Some(Value::String(message)) => {
            let trimmed = message.trim();
            if trimmed.is_empty() {
                Err(ServerError::BadRequest("Message cannot be empty".to_string()))
            } else {
                Ok(trimmed)
            }
        }
        Some(_) => Err(ServerError::BadRequest("Message must be a string".to_string())),
    }
}

/// POST /api/reply
pub async fn reply_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReplyResponse>, ServerError> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let message = validate_message(&body)?;

    let reply = state.replies.get_reply(message).await;
    tracing::info!(
        message_len = message.len(),
        source = ?reply.source,
        "Reply produced"
    );

    Ok(Json(ReplyResponse { reply: reply.text }))
}
