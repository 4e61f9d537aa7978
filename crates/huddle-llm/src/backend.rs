//! Completion backend trait and the in-process mock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LlmError, Result};

/// A single outbound completion call.
///
/// Implementations return the raw response body on a success status and an
/// [`LlmError`] classified by status otherwise. Interpreting the body is the
/// job of [`crate::extract`], so a backend never has to know which JSON shape
/// the upstream service speaks.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `message` and return the upstream body verbatim.
    async fn complete(&self, message: &str) -> Result<String>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn CompletionBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted response for [`MockBackend`].
#[derive(Debug)]
pub enum MockResponse {
    /// Return this body as if the upstream answered 200.
    Body(String),
    /// Fail with this error.
    Error(LlmError),
    /// Wait, then produce the inner response.
    Delayed(Duration, Box<MockResponse>),
}

impl MockResponse {
    /// A body response.
    pub fn body(body: impl Into<String>) -> Self {
        Self::Body(body.into())
    }

    /// Wrap this response in a delay.
    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

/// A mock backend for tests and for the `mock` configuration flag.
///
/// Scripted responses are returned in order. Once they run out, an echo
/// backend keeps answering with a canned reply that quotes the message;
/// a plain scripted backend returns an error instead.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: Mutex<VecDeque<MockResponse>>,
    request_log: Mutex<Vec<String>>,
    echo: bool,
}

impl MockBackend {
    /// Create a mock backend with the given scripted responses.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses.into()),
            request_log: Mutex::new(Vec::new()),
            echo: false,
        }
    }

    /// Create a mock backend that answers every message with a canned echo.
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::new(Vec::new())
        }
    }

    /// The canned reply the echo backend produces for `message`.
    pub fn echo_reply(message: &str) -> String {
        format!("This is a mock reply to: \"{}\"", message)
    }

    /// Get all messages that were sent to this backend.
    pub fn requests(&self) -> Vec<String> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, message: &str) -> Result<String> {
        self.request_log.lock().push(message.to_string());

        let next = self.responses.lock().pop_front();
        let mut response = match next {
            Some(response) => response,
            None if self.echo => {
                let body = serde_json::json!({ "reply": Self::echo_reply(message) });
                return Ok(body.to_string());
            }
            None => {
                return Err(LlmError::Internal(
                    "MockBackend: no more responses available".to_string(),
                ));
            }
        };

        loop {
            match response {
                MockResponse::Body(body) => return Ok(body),
                MockResponse::Error(err) => return Err(err),
                MockResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
