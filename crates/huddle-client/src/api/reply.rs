//! Reply API.

use crate::client::HuddleClient;
use crate::error::Result;
use crate::types::{ReplyRequest, ReplyResponse};

/// Reply API client.
pub struct ReplyApi {
    client: HuddleClient,
}

impl ReplyApi {
    pub(crate) fn new(client: HuddleClient) -> Self {
        Self { client }
    }

    /// Send a full reply request.
    pub async fn send(&self, request: &ReplyRequest) -> Result<ReplyResponse> {
        self.client.post("reply", request).await
    }

    /// Ask for a reply to `message` and return just the text.
    pub async fn ask(&self, message: impl Into<String>) -> Result<String> {
        let request = ReplyRequest {
            message: message.into(),
        };
        Ok(self.send(&request).await?.reply)
    }
}
