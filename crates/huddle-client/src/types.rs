//! Request and response types for the Huddle API, plus the chat data model.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// HTTP API
// ─────────────────────────────────────────────────────────────────────────────

/// A signed token request issued by the server for the messaging backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub key_name: String,
    /// Lifetime in milliseconds.
    pub ttl: u64,
    /// JSON-encoded capability map.
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub timestamp: i64,
    pub nonce: String,
    pub mac: String,
}

impl TokenRequest {
    /// Whether the capability grants anything on `channel`.
    pub fn allows_channel(&self, channel: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(&self.capability)
            .ok()
            .and_then(|caps| caps.get(channel).cloned())
            .is_some()
    }
}

/// Query for the token endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenQuery<'a> {
    pub client_id: &'a str,
}

/// Request body for the reply endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
}

/// Response from the reply endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub reply: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status (`ok` when serving).
    pub status: String,
    /// Server version.
    #[serde(default)]
    pub version: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat data model
// ─────────────────────────────────────────────────────────────────────────────

/// One chat line. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

/// A client present on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMember {
    pub client_id: String,
    pub display_name: Option<String>,
}

impl PresenceMember {
    /// The name to show for this member.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.client_id)
    }
}

/// Connection status of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Uninitialized,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Uninitialized => "uninitialized",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
