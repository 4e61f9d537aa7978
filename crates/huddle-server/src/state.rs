//! Application state shared across handlers.

use std::sync::Arc;

use huddle_llm::ReplyService;

use crate::config::ServerConfig;
use crate::token::TokenIssuer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// AI reply proxy.
    pub replies: Arc<ReplyService>,

    /// Token issuer for the messaging backend.
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: ServerConfig, replies: ReplyService, tokens: TokenIssuer) -> Self {
        Self {
            config: Arc::new(config),
            replies: Arc::new(replies),
            tokens: Arc::new(tokens),
        }
    }
}
