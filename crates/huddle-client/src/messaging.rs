//! Narrow interface over the hosted publish/subscribe messaging backend.
//!
//! The chat session controller only ever talks to these traits, so its
//! reconciliation logic runs unchanged against the real service, the
//! in-process [`crate::loopback::LoopbackHub`], or a test fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::TokenRequest;

/// Event name used for chat lines on the channel.
pub const MESSAGE_EVENT: &str = "chat-message";

/// Errors reported by a messaging backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    /// The connection could not be opened or was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend refused the operation (bad token, missing capability, ...).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The channel handle has already been closed.
    #[error("Channel is closed")]
    Closed,
}

pub type MessagingResult<T> = std::result::Result<T, MessagingError>;

/// A message as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Backend-assigned identifier. May be empty for backends that omit it.
    #[serde(default)]
    pub id: String,
    /// Event name the message was published under.
    pub name: String,
    /// Publishing connection's client id, if known.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Arbitrary JSON payload.
    pub data: Value,
    /// Backend-assigned timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A presence record as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub client_id: String,
    #[serde(default)]
    pub data: Value,
}

/// Kind of presence change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Enter,
    Update,
    Leave,
}

/// Connection lifecycle as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Failed(String),
}

/// Everything a subscription can deliver, in backend order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(InboundMessage),
    Presence {
        action: PresenceAction,
        member: PresenceMessage,
    },
    Connection(ConnectionState),
}

/// Opens channel handles.
#[async_trait]
pub trait Messaging: Send + Sync {
    /// Connect to `channel` with a signed token request and a client id.
    async fn connect(
        &self,
        token: &TokenRequest,
        client_id: &str,
        channel: &str,
    ) -> MessagingResult<Box<dyn ChannelHandle>>;
}

/// One open channel on one connection.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Start receiving message, presence and connection events.
    async fn subscribe(&self) -> MessagingResult<mpsc::UnboundedReceiver<ChannelEvent>>;

    /// Stop receiving events.
    async fn unsubscribe(&self) -> MessagingResult<()>;

    /// Publish a named event with a JSON payload.
    async fn publish(&self, name: &str, payload: Value) -> MessagingResult<()>;

    /// Current presence snapshot.
    async fn presence_members(&self) -> MessagingResult<Vec<PresenceMessage>>;

    /// Enter presence with a payload.
    async fn enter_presence(&self, payload: Value) -> MessagingResult<()>;

    /// Replace this client's presence payload.
    async fn update_presence(&self, payload: Value) -> MessagingResult<()>;

    /// Leave presence.
    async fn leave_presence(&self) -> MessagingResult<()>;

    /// Up to `limit` most recent messages, newest first.
    async fn history(&self, limit: usize) -> MessagingResult<Vec<InboundMessage>>;

    /// Close the connection. Further calls fail with [`MessagingError::Closed`].
    async fn close(&self) -> MessagingResult<()>;
}
