//! Chat session controller.
//!
//! A [`ChatSession`] owns one connection to one channel. It acquires a token,
//! connects through a [`Messaging`] backend, and reconciles its
//! [`SessionState`] from delivered events. Sending publishes the user's line
//! and then publishes the assistant's reply to the same channel.
//!
//! ```text
//! initialize ──► token ──► connect ──► subscribe ──► presence snapshot
//!                                                    ──► history ──► enter
//!
//! send_message ──► publish(user) ──► get_reply ──► publish(assistant)
//! ```
//!
//! The session is a single owner: events are applied one at a time through
//! `&mut self`, and no locks guard the state.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::messaging::{
    ChannelEvent, ChannelHandle, ConnectionState, MESSAGE_EVENT, Messaging, MessagingError,
    PresenceAction,
};
use crate::names::normalize_display_name;
use crate::state::{
    SessionState, chat_message_from, member_from, message_payload, now_millis, presence_payload,
};
use crate::types::{ChatMessage, ConnectionStatus, PresenceMember, TokenRequest};

/// Default channel name.
pub const DEFAULT_CHANNEL: &str = "huddle-chat";

/// Messages fetched from history on initialization.
pub const HISTORY_LIMIT: usize = 20;

/// Sender used for automated replies.
pub const ASSISTANT_SENDER: &str = "AI Assistant";

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Issues signed token requests for a client id.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token_request(&self, client_id: &str) -> Result<TokenRequest>;
}

/// Produces an automated reply for a message.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn get_reply(&self, message: &str) -> Result<String>;
}

/// Errors surfaced by [`ChatSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to obtain token: {0}")]
    Token(#[source] crate::Error),

    #[error("Failed to connect: {0}")]
    Connect(#[source] MessagingError),

    #[error("Failed to subscribe: {0}")]
    Subscribe(#[source] MessagingError),

    #[error("Failed to send message: {0}")]
    Publish(#[source] MessagingError),

    #[error("Session has been torn down")]
    TornDown,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub channel: String,
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl SessionConfig {
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

/// What [`ChatSession::send_message`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was published: empty text or no open channel.
    Skipped,
    /// The user's line was published. `reply` holds the assistant text when
    /// it was obtained and published too.
    Sent { reply: Option<String> },
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Controller for one chat channel.
pub struct ChatSession {
    config: SessionConfig,
    tokens: Arc<dyn TokenSource>,
    replies: Arc<dyn ReplyProvider>,
    messaging: Arc<dyn Messaging>,
    state: SessionState,
    channel: Option<Arc<dyn ChannelHandle>>,
    events: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    /// Display name last accepted by the backend's presence set.
    advertised: Option<String>,
    torn_down: bool,
}

impl ChatSession {
    /// Create an uninitialized session. A blank `display_name` becomes a
    /// generated guest name.
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        replies: Arc<dyn ReplyProvider>,
        messaging: Arc<dyn Messaging>,
        config: SessionConfig,
        display_name: Option<&str>,
    ) -> Self {
        Self {
            config,
            tokens,
            replies,
            messaging,
            state: SessionState::new(normalize_display_name(display_name)),
            channel: None,
            events: None,
            advertised: None,
            torn_down: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status
    }

    pub fn display_name(&self) -> &str {
        &self.state.display_name
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.state.messages()
    }

    pub fn roster(&self) -> &[PresenceMember] {
        self.state.roster()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Clear the blocking notice, returning it.
    pub fn dismiss_notice(&mut self) -> Option<String> {
        self.state.notice.take()
    }

    /// Connect, subscribe and load the initial view.
    ///
    /// Token, connect and subscribe failures leave the session `failed` and
    /// are returned. Presence snapshot, history and presence entry failures
    /// are logged and the session still comes up.
    pub async fn initialize(&mut self) -> SessionResult<()> {
        if self.torn_down {
            return Err(SessionError::TornDown);
        }
        if self.channel.is_some() {
            return Ok(());
        }

        self.state.status = ConnectionStatus::Connecting;
        let client_id = self.state.display_name.clone();
        let channel_name = self.config.channel.clone();

        let token = match self.tokens.token_request(&client_id).await {
            Ok(token) => token,
            Err(e) => return Err(self.fail(SessionError::Token(e))),
        };

        let channel: Arc<dyn ChannelHandle> = match self
            .messaging
            .connect(&token, &client_id, &channel_name)
            .await
        {
            Ok(handle) => Arc::from(handle),
            Err(e) => return Err(self.fail(SessionError::Connect(e))),
        };

        let events = match channel.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    debug!(error = %close_err, "Failed to close channel after subscribe error");
                }
                return Err(self.fail(SessionError::Subscribe(e)));
            }
        };

        match channel.presence_members().await {
            Ok(members) => self.state.seed_roster(members.iter().map(member_from)),
            Err(e) => warn!(error = %e, "Failed to fetch presence snapshot"),
        }

        match channel.history(self.config.history_limit).await {
            Ok(newest_first) => {
                let messages: Vec<ChatMessage> = newest_first
                    .iter()
                    .rev()
                    .filter_map(chat_message_from)
                    .collect();
                self.state.replace_messages(messages);
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch message history");
                self.state.replace_messages(Vec::new());
            }
        }

        self.channel = Some(Arc::clone(&channel));
        self.events = Some(events);
        self.state.status = ConnectionStatus::Connected;
        self.sync_presence().await;

        info!(
            channel = %channel_name,
            client_id = %client_id,
            members = self.state.roster().len(),
            history = self.state.messages().len(),
            "Chat session connected"
        );
        Ok(())
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        warn!(error = %error, "Chat session failed to initialize");
        self.state.status = ConnectionStatus::Failed;
        error
    }

    /// Bring the backend's presence payload in line with the local display
    /// name: enter on first use, update afterwards.
    async fn sync_presence(&mut self) {
        let Some(channel) = self.channel.clone() else {
            return;
        };
        let name = self.state.display_name.clone();
        if self.advertised.as_deref() == Some(name.as_str()) {
            return;
        }

        let result = if self.advertised.is_some() {
            channel.update_presence(presence_payload(&name)).await
        } else {
            channel.enter_presence(presence_payload(&name)).await
        };

        match result {
            Ok(()) => self.advertised = Some(name),
            Err(e) => warn!(error = %e, display_name = %name, "Failed to update presence"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Wait for the next delivered event. `None` once the subscription ends.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Apply every event already delivered. Returns how many were applied.
    pub async fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(event) = self.events.as_mut().and_then(|rx| rx.try_recv().ok()) else {
                return applied;
            };
            self.handle_event(event).await;
            applied += 1;
        }
    }

    /// Apply one event to the local view. Returns whether anything changed.
    pub async fn handle_event(&mut self, event: ChannelEvent) -> bool {
        match event {
            ChannelEvent::Message(inbound) => match chat_message_from(&inbound) {
                Some(message) => self.state.append_message(message),
                None => {
                    debug!(name = %inbound.name, "Ignoring message without chat text");
                    false
                }
            },
            ChannelEvent::Presence { action, member } => match action {
                PresenceAction::Enter => self.state.presence_enter(member_from(&member)),
                PresenceAction::Update => {
                    self.state.presence_update(member_from(&member));
                    true
                }
                PresenceAction::Leave => self.state.presence_leave(&member.client_id),
            },
            ChannelEvent::Connection(state) => self.handle_connection(state).await,
        }
    }

    async fn handle_connection(&mut self, state: ConnectionState) -> bool {
        let previous = self.state.status;
        match state {
            ConnectionState::Connected => {
                if previous == ConnectionStatus::Failed {
                    return false;
                }
                self.state.status = ConnectionStatus::Connected;
                self.sync_presence().await;
            }
            ConnectionState::Disconnected => {
                if previous != ConnectionStatus::Connected {
                    return false;
                }
                self.state.status = ConnectionStatus::Disconnected;
            }
            ConnectionState::Failed(reason) => {
                warn!(reason = %reason, "Messaging connection failed");
                self.state.status = ConnectionStatus::Failed;
                self.state.notice = Some(format!("Connection failed: {}", reason));
            }
        }
        info!(from = %previous, to = %self.state.status, "Connection status changed");
        previous != self.state.status
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User actions
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish a chat line and then the assistant's reply to it.
    ///
    /// The user's line is not appended locally; it shows up when the backend
    /// echoes it. If publishing it fails, `text` goes back into the draft and
    /// a notice is set. Reply failures are only logged.
    pub async fn send_message(&mut self, text: &str) -> SessionResult<SendOutcome> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !self.state.status.is_connected() {
            return Ok(SendOutcome::Skipped);
        }
        let Some(channel) = self.channel.clone() else {
            return Ok(SendOutcome::Skipped);
        };

        let payload = message_payload(trimmed, &self.state.display_name, now_millis());
        if let Err(e) = channel.publish(MESSAGE_EVENT, payload).await {
            warn!(error = %e, "Failed to publish message");
            self.state.draft = text.to_string();
            self.state.notice = Some(format!("Your message could not be sent: {}", e));
            return Err(SessionError::Publish(e));
        }
        self.state.draft.clear();

        let reply = match self.replies.get_reply(trimmed).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Failed to get assistant reply");
                return Ok(SendOutcome::Sent { reply: None });
            }
        };
        let reply = reply.trim();
        if reply.is_empty() {
            return Ok(SendOutcome::Sent { reply: None });
        }

        let payload = message_payload(reply, ASSISTANT_SENDER, now_millis());
        match channel.publish(MESSAGE_EVENT, payload).await {
            Ok(()) => Ok(SendOutcome::Sent {
                reply: Some(reply.to_string()),
            }),
            Err(e) => {
                warn!(error = %e, "Failed to publish assistant reply");
                Ok(SendOutcome::Sent { reply: None })
            }
        }
    }

    /// Change the display name. Applied to presence now when connected,
    /// otherwise on the next reconnection.
    pub async fn set_display_name(&mut self, name: &str) {
        let name = normalize_display_name(Some(name));
        if name == self.state.display_name {
            return;
        }
        self.state.display_name = name;
        if self.state.status.is_connected() {
            self.sync_presence().await;
        } else {
            debug!(display_name = %self.state.display_name, "Presence update deferred until connected");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Leave presence, unsubscribe and close. Safe to call repeatedly.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.events = None;
        if let Some(channel) = self.channel.take() {
            release(channel).await;
        }
        if self.state.status != ConnectionStatus::Failed {
            self.state.status = ConnectionStatus::Disconnected;
        }
    }
}

async fn release(channel: Arc<dyn ChannelHandle>) {
    if let Err(e) = channel.leave_presence().await {
        debug!(error = %e, "Failed to leave presence");
    }
    if let Err(e) = channel.unsubscribe().await {
        debug!(error = %e, "Failed to unsubscribe");
    }
    if let Err(e) = channel.close().await {
        debug!(error = %e, "Failed to close channel");
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        let Some(channel) = self.channel.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release(channel));
            }
            Err(_) => warn!("Chat session dropped outside a runtime; channel not released"),
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("channel", &self.config.channel)
            .field("display_name", &self.state.display_name)
            .field("status", &self.state.status)
            .finish()
    }
}
