//! Token API.

use crate::client::HuddleClient;
use crate::error::Result;
use crate::types::{TokenQuery, TokenRequest};

/// Token API client.
pub struct TokenApi {
    client: HuddleClient,
}

impl TokenApi {
    pub(crate) fn new(client: HuddleClient) -> Self {
        Self { client }
    }

    /// Request a signed token request bound to `client_id`.
    pub async fn request(&self, client_id: &str) -> Result<TokenRequest> {
        self.client
            .get_with_query("token", &TokenQuery { client_id })
            .await
    }
}
