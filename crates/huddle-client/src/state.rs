//! Local view of one chat channel, reconciled from delivered events.
//!
//! Everything here is synchronous and pure; the controller in
//! [`crate::session`] owns a [`SessionState`] and feeds it events.

use rand::Rng;
use serde_json::{Value, json};

use crate::messaging::{InboundMessage, MESSAGE_EVENT, PresenceMessage};
use crate::types::{ChatMessage, ConnectionStatus, PresenceMember};

/// Session state for one chat view.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Name advertised in presence and used as sender.
    pub display_name: String,
    pub status: ConnectionStatus,
    /// Text in the input box.
    pub draft: String,
    /// Blocking notice shown to the user, if any.
    pub notice: Option<String>,
    messages: Vec<ChatMessage>,
    roster: Vec<PresenceMember>,
}

impl SessionState {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            status: ConnectionStatus::Uninitialized,
            draft: String::new(),
            notice: None,
            messages: Vec::new(),
            roster: Vec::new(),
        }
    }

    /// Messages in delivery order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Present members in first-seen order.
    pub fn roster(&self) -> &[PresenceMember] {
        &self.roster
    }

    /// Look up a present member.
    pub fn member(&self, client_id: &str) -> Option<&PresenceMember> {
        self.roster.iter().find(|m| m.client_id == client_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a message unless one with the same id is already present.
    pub fn append_message(&mut self, message: ChatMessage) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Replace the whole list, e.g. from a history fetch. Duplicate ids keep
    /// their first occurrence.
    pub fn replace_messages(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.clear();
        for message in messages {
            self.append_message(message);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Presence
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a member unless its client id is already present.
    pub fn presence_enter(&mut self, member: PresenceMember) -> bool {
        if self.member(&member.client_id).is_some() {
            return false;
        }
        self.roster.push(member);
        true
    }

    /// Replace a member's payload, adding the member when unknown.
    pub fn presence_update(&mut self, member: PresenceMember) {
        match self
            .roster
            .iter_mut()
            .find(|m| m.client_id == member.client_id)
        {
            Some(existing) => existing.display_name = member.display_name,
            None => self.roster.push(member),
        }
    }

    /// Remove a member by client id. No-op when absent.
    pub fn presence_leave(&mut self, client_id: &str) -> bool {
        let before = self.roster.len();
        self.roster.retain(|m| m.client_id != client_id);
        self.roster.len() != before
    }

    /// Seed the roster from a snapshot.
    pub fn seed_roster(&mut self, members: impl IntoIterator<Item = PresenceMember>) {
        for member in members {
            self.presence_enter(member);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Payload published for one chat line.
pub fn message_payload(text: &str, sender: &str, timestamp: i64) -> Value {
    json!({ "text": text, "sender": sender, "timestamp": timestamp })
}

/// Presence payload advertising a display name.
pub fn presence_payload(display_name: &str) -> Value {
    json!({ "displayName": display_name })
}

/// Milliseconds since the epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Local identifier for messages the backend delivered without one.
pub fn synthesize_id(timestamp: i64) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{}-{:08x}", timestamp, suffix)
}

/// Rebuild a [`ChatMessage`] from a delivered message.
///
/// Returns `None` for other event names and for payloads without text.
pub fn chat_message_from(inbound: &InboundMessage) -> Option<ChatMessage> {
    if inbound.name != MESSAGE_EVENT {
        return None;
    }

    let text = inbound
        .data
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())?;

    let sender = inbound
        .data
        .get("sender")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| inbound.client_id.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    let timestamp = inbound
        .timestamp
        .or_else(|| inbound.data.get("timestamp").and_then(Value::as_i64))
        .unwrap_or_else(now_millis);

    let id = if inbound.id.is_empty() {
        synthesize_id(timestamp)
    } else {
        inbound.id.clone()
    };

    Some(ChatMessage {
        id,
        text: text.to_string(),
        sender,
        timestamp,
    })
}

/// Rebuild a [`PresenceMember`] from a presence record.
pub fn member_from(presence: &PresenceMessage) -> PresenceMember {
    let display_name = match &presence.data {
        Value::String(s) => Some(s.clone()),
        data => data
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
    .filter(|n| !n.trim().is_empty());

    PresenceMember {
        client_id: presence.client_id.clone(),
        display_name,
    }
}
