//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]       # bind address, logging, CORS
//! [messaging]    # channel name, token lifetime, backend key
//! [completion]   # AI reply endpoint and model parameters
//! ```

use serde::{Deserialize, Serialize};

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default channel every client joins.
pub const DEFAULT_CHANNEL: &str = "huddle-chat";

/// Default lifetime of an issued token request (one hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Default completion endpoint (OpenAI-compatible chat completions).
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Hard bound on a single completion call.
pub const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 30;

/// Largest accepted `timeout_secs`. Clients give up on `/api/reply` a few
/// seconds after this, so a longer bound would never produce a fallback.
pub const MAX_REPLY_TIMEOUT_SECS: u64 = 30;

/// Default completion token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 256;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    /// HTTP server settings.
    pub server: Option<ServerConfig>,

    /// Messaging backend settings (token issuance).
    pub messaging: Option<MessagingConfig>,

    /// AI reply endpoint settings.
    pub completion: Option<CompletionConfig>,
}

impl HuddleConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced wholesale, matching how a project-local file
    /// shadows the user config.
    pub fn merge(&mut self, other: HuddleConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.messaging.is_some() {
            self.messaging = other.messaging;
        }

        if other.completion.is_some() {
            self.completion = other.completion;
        }
    }

    /// Server section, or defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Messaging section, or defaults.
    pub fn messaging(&self) -> MessagingConfig {
        self.messaging.clone().unwrap_or_default()
    }

    /// Completion section, or defaults.
    pub fn completion(&self) -> CompletionConfig {
        self.completion.clone().unwrap_or_default()
    }

    /// Mutable completion section, created on first access.
    pub fn completion_mut(&mut self) -> &mut CompletionConfig {
        self.completion.get_or_insert_with(CompletionConfig::default)
    }

    /// Mutable messaging section, created on first access.
    pub fn messaging_mut(&mut self) -> &mut MessagingConfig {
        self.messaging.get_or_insert_with(MessagingConfig::default)
    }

    /// Mutable server section, created on first access.
    pub fn server_mut(&mut self) -> &mut ServerConfig {
        self.server.get_or_insert_with(ServerConfig::default)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable request logging.
    pub request_logging: bool,
    /// CORS allowed origins (empty = no CORS layer).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            request_logging: true,
            cors_origins: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messaging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Messaging backend section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// The single channel every token is scoped to.
    pub channel: String,
    /// Token request lifetime in seconds.
    pub token_ttl_secs: u64,
    /// Backend key in `name:secret` form (prefer the env var; warns if set here).
    pub api_key: Option<String>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            api_key: None,
        }
    }
}

impl MessagingConfig {
    /// Returns true if the backend key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Completion Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// AI reply endpoint section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Completion endpoint URL.
    pub endpoint: String,
    /// Bearer key for the endpoint (prefer the env var; warns if set here).
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Completion token budget.
    pub max_tokens: Option<u32>,
    /// Optional system prompt prepended to the user's message.
    pub system_prompt: Option<String>,
    /// Replace the live call with a canned reply.
    pub mock: bool,
    /// Bound on a single completion call in seconds, capped at
    /// [`MAX_REPLY_TIMEOUT_SECS`].
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            system_prompt: None,
            mock: false,
            timeout_secs: DEFAULT_REPLY_TIMEOUT_SECS,
        }
    }
}

impl CompletionConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The completion bound, clamped to `1..=MAX_REPLY_TIMEOUT_SECS`.
    pub fn reply_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.clamp(1, MAX_REPLY_TIMEOUT_SECS))
    }
}
