//! The reply service: one bounded completion call, always one string out.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{CompletionBackend, MockBackend, SharedBackend};
use crate::error::LlmError;
use crate::extract::{Extraction, extract_body};
use crate::fallback::Fallback;

/// Default bound on a single completion call.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a reply's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// A named extraction strategy matched the body.
    Extracted(&'static str),
    /// The body was not JSON and was used verbatim.
    RawText,
    /// A canned fallback sentence.
    Fallback(Fallback),
}

/// A normalized reply. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    fn fallback(fallback: Fallback) -> Self {
        Self {
            text: fallback.text().to_string(),
            source: ReplySource::Fallback(fallback),
        }
    }

    /// Whether this reply is a canned fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ReplySource::Fallback(_))
    }
}

/// Turns a message into exactly one reply string.
///
/// Upstream failures of every kind (timeouts, transport errors, non-success
/// statuses, unusable bodies) are folded into a [`Fallback`]; the caller
/// never sees an error.
#[derive(Clone)]
pub struct ReplyService {
    backend: SharedBackend,
    timeout: Duration,
}

impl ReplyService {
    /// Create a service over the given backend with the default timeout.
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Create a service that echoes messages through [`MockBackend::echo`].
    pub fn mock() -> Self {
        Self::new(Arc::new(MockBackend::echo()))
    }

    /// Set the bound on a single completion call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Get a reply for `message`.
    ///
    /// Dropping the outbound future on expiry cancels the HTTP call.
    pub async fn get_reply(&self, message: &str) -> Reply {
        let result = match tokio::time::timeout(self.timeout, self.backend.complete(message)).await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        };

        let body = match result {
            Ok(body) => body,
            Err(err) => {
                let fallback = Fallback::from(&err);
                tracing::warn!(
                    backend = %self.backend.name(),
                    error = %err,
                    fallback = fallback.label(),
                    "Completion call failed, using fallback reply"
                );
                return Reply::fallback(fallback);
            }
        };

        match extract_body(&body) {
            Extraction::Matched { text, strategy } => {
                tracing::debug!(strategy, "Extracted reply");
                Reply {
                    text,
                    source: ReplySource::Extracted(strategy),
                }
            }
            Extraction::RawText(text) => {
                tracing::debug!("Completion body is not JSON, using raw text");
                Reply {
                    text,
                    source: ReplySource::RawText,
                }
            }
            Extraction::Empty => {
                tracing::warn!(
                    backend = %self.backend.name(),
                    body_len = body.len(),
                    "No reply text found in completion body"
                );
                Reply::fallback(Fallback::Unavailable)
            }
        }
    }
}

impl std::fmt::Debug for ReplyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyService")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
