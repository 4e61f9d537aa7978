//! Canned replies used when the completion endpoint gives us nothing usable.

use crate::error::LlmError;

/// Why a fallback reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The call exceeded the reply bound.
    Timeout,
    /// The endpoint rejected our credentials.
    Unauthorized,
    /// The endpoint is rate limiting us.
    RateLimited,
    /// The endpoint returned a 5xx.
    ServerError,
    /// Any other transport or status failure.
    Failed,
    /// The call succeeded but no reply text could be extracted.
    Unavailable,
}

impl Fallback {
    /// The user-facing sentence for this fallback.
    pub fn text(self) -> &'static str {
        match self {
            Fallback::Timeout => {
                "Sorry, the AI assistant took too long to respond. Please try again."
            }
            Fallback::Unauthorized => {
                "Sorry, the AI assistant is not configured correctly right now."
            }
            Fallback::RateLimited => {
                "The AI assistant is getting too many requests. Please wait a moment and try again."
            }
            Fallback::ServerError => {
                "The AI assistant service is having trouble right now. Please try again later."
            }
            Fallback::Failed => "Sorry, I couldn't reach the AI assistant. Please try again.",
            Fallback::Unavailable => "Sorry, I don't have a response for that right now.",
        }
    }

    /// Short label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Fallback::Timeout => "timeout",
            Fallback::Unauthorized => "unauthorized",
            Fallback::RateLimited => "rate_limited",
            Fallback::ServerError => "server_error",
            Fallback::Failed => "failed",
            Fallback::Unavailable => "unavailable",
        }
    }
}

impl From<&LlmError> for Fallback {
    fn from(err: &LlmError) -> Self {
        match err {
            LlmError::Timeout(_) => Fallback::Timeout,
            LlmError::Auth { .. } => Fallback::Unauthorized,
            LlmError::RateLimit(_) => Fallback::RateLimited,
            LlmError::Server { .. } => Fallback::ServerError,
            _ => Fallback::Failed,
        }
    }
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}
