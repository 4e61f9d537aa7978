//! CLI command handlers.

pub mod chat;
pub mod reply;
pub mod start;
pub mod status;
pub mod token;

use anyhow::Result;
use huddle_client::HuddleClient;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// HTTP client for the configured server.
    pub fn client(&self) -> Result<HuddleClient> {
        Ok(HuddleClient::builder()
            .base_url(&self.server_url)
            .build()?)
    }
}
