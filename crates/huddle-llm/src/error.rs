//! Error types for the completion backends.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

// ─────────────────────────────────────────────────────────────────────────────
// LlmError
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for completion calls.
///
/// Every variant is recovered into a fallback reply by
/// [`crate::ReplyService`]; none of them reach an end user.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The call did not finish within the reply bound.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network/connectivity error.
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication failed (401/403).
    #[error("Authentication error ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Rate limit exceeded (429).
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Upstream server error (5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Configuration error (bad endpoint URL, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error while building a request.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth { status, message },
            429 => Self::RateLimit(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Backend { status, message },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
