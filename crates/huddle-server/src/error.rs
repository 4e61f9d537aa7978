//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad request (validation failure).
    #[error("{0}")]
    BadRequest(String),

    /// Required configuration is missing or malformed.
    #[error("{message}")]
    Config {
        message: String,
        details: Option<String>,
    },

    /// The messaging backend could not mint a token.
    #[error("{message}")]
    TokenIssue {
        message: String,
        details: Option<String>,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Configuration error with diagnostic details.
    pub fn config(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Token minting failure with diagnostic details.
    pub fn token_issue(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::TokenIssue {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Config { .. }
            | ServerError::TokenIssue { .. }
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ServerError::Config { details, .. } | ServerError::TokenIssue { details, .. } => {
                details.clone()
            }
            _ => None,
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Diagnostic detail, when there is any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %body.error,
                details = body.details.as_deref().unwrap_or(""),
                "Server error"
            );
        } else {
            tracing::warn!(status = %status, error = %body.error, "Client error");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_body() {
        let (status, body) = body_of(ServerError::BadRequest("Message is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_config_error_carries_details() {
        let (status, body) = body_of(ServerError::config(
            "Messaging key is not configured",
            "set HUDDLE_MESSAGING_KEY",
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Messaging key is not configured");
        assert_eq!(body["details"], "set HUDDLE_MESSAGING_KEY");
    }
}
