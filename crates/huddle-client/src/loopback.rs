//! In-process messaging hub.
//!
//! Implements [`Messaging`] without a network: every connection made through
//! the same [`LoopbackHub`] shares channels, presence and history. Used by the
//! `huddle chat` demo and by tests, which can also inject failures and
//! connection-state changes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::messaging::{
    ChannelEvent, ChannelHandle, ConnectionState, InboundMessage, Messaging, MessagingError,
    MessagingResult, PresenceAction, PresenceMessage,
};
use crate::state::now_millis;
use crate::types::TokenRequest;

/// Messages retained per channel. Older messages are dropped first.
pub const HISTORY_RETENTION: usize = 100;

/// Operations that can be made to fail once via [`LoopbackHub::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Subscribe,
    Publish,
    PresenceMembers,
    EnterPresence,
    UpdatePresence,
    History,
}

/// Shared in-process messaging backend.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Default)]
struct HubState {
    channels: HashMap<String, Channel>,
    next_connection: u64,
    next_message: u64,
    failures: Vec<Operation>,
}

#[derive(Default)]
struct Channel {
    subscribers: Vec<Subscriber>,
    presence: Vec<PresenceEntry>,
    history: VecDeque<InboundMessage>,
}

struct Subscriber {
    connection: u64,
    client_id: String,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

struct PresenceEntry {
    connection: u64,
    client_id: String,
    data: Value,
}

impl HubState {
    fn members(&self, channel: &str) -> Vec<PresenceMessage> {
        self.channels
            .get(channel)
            .map(|c| {
                c.presence
                    .iter()
                    .map(|p| PresenceMessage {
                        client_id: p.client_id.clone(),
                        data: p.data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn take_failure(&mut self, op: Operation) -> bool {
        match self.failures.iter().position(|f| *f == op) {
            Some(index) => {
                self.failures.remove(index);
                true
            }
            None => false,
        }
    }
}

impl Channel {
    /// Send an event to every live subscriber, dropping closed receivers.
    fn broadcast(&mut self, event: ChannelEvent) {
        self.subscribers
            .retain(|sub| sub.tx.send(event.clone()).is_ok());
    }
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with [`MessagingError::Connection`].
    pub fn fail_next(&self, op: Operation) {
        self.inner.lock().failures.push(op);
    }

    /// Deliver a connection-state event to every subscription owned by
    /// `client_id`.
    pub fn set_connection_state(&self, client_id: &str, state: ConnectionState) {
        let mut hub = self.inner.lock();
        for channel in hub.channels.values_mut() {
            channel.subscribers.retain(|sub| {
                sub.client_id != client_id
                    || sub.tx.send(ChannelEvent::Connection(state.clone())).is_ok()
            });
        }
    }

    /// Publish on `channel` as an out-of-band client.
    pub fn inject(&self, channel: &str, client_id: &str, name: &str, data: Value) {
        let mut hub = self.inner.lock();
        Self::publish_locked(&mut hub, channel, Some(client_id), name, data);
    }

    /// Add a presence member that has no connection of its own.
    pub fn inject_presence(&self, channel: &str, client_id: &str, data: Value) {
        let mut hub = self.inner.lock();
        let channel = hub.channels.entry(channel.to_string()).or_default();
        channel.presence.push(PresenceEntry {
            connection: 0,
            client_id: client_id.to_string(),
            data: data.clone(),
        });
        channel.broadcast(ChannelEvent::Presence {
            action: PresenceAction::Enter,
            member: PresenceMessage {
                client_id: client_id.to_string(),
                data,
            },
        });
    }

    /// Client ids currently present on `channel`.
    pub fn present(&self, channel: &str) -> Vec<String> {
        self.inner
            .lock()
            .channels
            .get(channel)
            .map(|c| c.presence.iter().map(|p| p.client_id.clone()).collect())
            .unwrap_or_default()
    }

    /// Presence records on `channel`, in entry order.
    pub fn members(&self, channel: &str) -> Vec<PresenceMessage> {
        self.inner.lock().members(channel)
    }

    /// Messages retained on `channel`, oldest first.
    pub fn history_of(&self, channel: &str) -> Vec<InboundMessage> {
        self.inner
            .lock()
            .channels
            .get(channel)
            .map(|c| c.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .lock()
            .channels
            .get(channel)
            .map(|c| c.subscribers.len())
            .unwrap_or(0)
    }

    fn publish_locked(
        hub: &mut HubState,
        channel: &str,
        client_id: Option<&str>,
        name: &str,
        data: Value,
    ) {
        hub.next_message += 1;
        let message = InboundMessage {
            id: format!("loop-{}", hub.next_message),
            name: name.to_string(),
            client_id: client_id.map(str::to_string),
            data,
            timestamp: Some(now_millis()),
        };
        let channel = hub.channels.entry(channel.to_string()).or_default();
        if channel.history.len() == HISTORY_RETENTION {
            channel.history.pop_front();
        }
        channel.history.push_back(message.clone());
        channel.broadcast(ChannelEvent::Message(message));
    }
}

#[async_trait]
impl Messaging for LoopbackHub {
    async fn connect(
        &self,
        token: &TokenRequest,
        client_id: &str,
        channel: &str,
    ) -> MessagingResult<Box<dyn ChannelHandle>> {
        let mut hub = self.inner.lock();
        if hub.take_failure(Operation::Connect) {
            return Err(MessagingError::Connection("injected connect failure".into()));
        }
        if !token.allows_channel(channel) {
            return Err(MessagingError::Rejected(format!(
                "token does not grant access to channel '{}'",
                channel
            )));
        }
        if let Some(bound) = &token.client_id
            && bound != client_id
        {
            return Err(MessagingError::Rejected(format!(
                "token is bound to client '{}'",
                bound
            )));
        }

        hub.next_connection += 1;
        let connection = hub.next_connection;
        hub.channels.entry(channel.to_string()).or_default();
        debug!(connection, client_id, channel, "Loopback connection opened");

        Ok(Box::new(LoopbackChannel {
            hub: Arc::clone(&self.inner),
            connection,
            client_id: client_id.to_string(),
            channel: channel.to_string(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A connection to one loopback channel.
struct LoopbackChannel {
    hub: Arc<Mutex<HubState>>,
    connection: u64,
    client_id: String,
    channel: String,
    closed: AtomicBool,
}

impl LoopbackChannel {
    /// Lock the hub, failing if this handle is closed or `op` was set to fail.
    fn open(&self, op: Option<Operation>) -> MessagingResult<parking_lot::MutexGuard<'_, HubState>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MessagingError::Closed);
        }
        let mut hub = self.hub.lock();
        if let Some(op) = op
            && hub.take_failure(op)
        {
            return Err(MessagingError::Connection(format!("injected {:?} failure", op)));
        }
        Ok(hub)
    }

    fn set_presence(&self, hub: &mut HubState, action: PresenceAction, data: Value) {
        let channel = hub.channels.entry(self.channel.clone()).or_default();
        if action == PresenceAction::Leave {
            let before = channel.presence.len();
            channel.presence.retain(|p| p.connection != self.connection);
            if channel.presence.len() == before {
                return;
            }
        } else if let Some(entry) = channel
            .presence
            .iter_mut()
            .find(|p| p.connection == self.connection)
        {
            entry.data = data.clone();
        } else {
            channel.presence.push(PresenceEntry {
                connection: self.connection,
                client_id: self.client_id.clone(),
                data: data.clone(),
            });
        }
        channel.broadcast(ChannelEvent::Presence {
            action,
            member: PresenceMessage {
                client_id: self.client_id.clone(),
                data,
            },
        });
    }
}

#[async_trait]
impl ChannelHandle for LoopbackChannel {
    async fn subscribe(&self) -> MessagingResult<mpsc::UnboundedReceiver<ChannelEvent>> {
        let mut hub = self.open(Some(Operation::Subscribe))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = hub.channels.entry(self.channel.clone()).or_default();
        channel.subscribers.retain(|s| s.connection != self.connection);
        channel.subscribers.push(Subscriber {
            connection: self.connection,
            client_id: self.client_id.clone(),
            tx,
        });
        Ok(rx)
    }

    async fn unsubscribe(&self) -> MessagingResult<()> {
        let mut hub = self.open(None)?;
        if let Some(channel) = hub.channels.get_mut(&self.channel) {
            channel.subscribers.retain(|s| s.connection != self.connection);
        }
        Ok(())
    }

    async fn publish(&self, name: &str, payload: Value) -> MessagingResult<()> {
        let mut hub = self.open(Some(Operation::Publish))?;
        LoopbackHub::publish_locked(&mut hub, &self.channel, Some(&self.client_id), name, payload);
        Ok(())
    }

    async fn presence_members(&self) -> MessagingResult<Vec<PresenceMessage>> {
        let hub = self.open(Some(Operation::PresenceMembers))?;
        Ok(hub.members(&self.channel))
    }

    async fn enter_presence(&self, payload: Value) -> MessagingResult<()> {
        let mut hub = self.open(Some(Operation::EnterPresence))?;
        self.set_presence(&mut hub, PresenceAction::Enter, payload);
        Ok(())
    }

    async fn update_presence(&self, payload: Value) -> MessagingResult<()> {
        let mut hub = self.open(Some(Operation::UpdatePresence))?;
        self.set_presence(&mut hub, PresenceAction::Update, payload);
        Ok(())
    }

    async fn leave_presence(&self) -> MessagingResult<()> {
        let mut hub = self.open(None)?;
        self.set_presence(&mut hub, PresenceAction::Leave, Value::Null);
        Ok(())
    }

    async fn history(&self, limit: usize) -> MessagingResult<Vec<InboundMessage>> {
        let hub = self.open(Some(Operation::History))?;
        Ok(hub
            .channels
            .get(&self.channel)
            .map(|c| c.history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn close(&self) -> MessagingResult<()> {
        let mut hub = self.open(None)?;
        self.set_presence(&mut hub, PresenceAction::Leave, Value::Null);
        if let Some(channel) = hub.channels.get_mut(&self.channel) {
            channel.subscribers.retain(|s| s.connection != self.connection);
        }
        self.closed.store(true, Ordering::SeqCst);
        debug!(connection = self.connection, "Loopback connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MESSAGE_EVENT;
    use serde_json::json;

    const CHANNEL: &str = "room";

    fn token(client_id: Option<&str>, channel: &str) -> TokenRequest {
        let mut capability = serde_json::Map::new();
        capability.insert(
            channel.to_string(),
            json!(["subscribe", "publish", "presence", "history"]),
        );
        TokenRequest {
            key_name: "k".to_string(),
            ttl: 60_000,
            capability: Value::Object(capability).to_string(),
            client_id: client_id.map(str::to_string),
            timestamp: 0,
            nonce: "n".to_string(),
            mac: "m".to_string(),
        }
    }

    async fn connect(hub: &LoopbackHub, client_id: &str) -> Box<dyn ChannelHandle> {
        hub.connect(&token(Some(client_id), CHANNEL), client_id, CHANNEL)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_checks_token_scope() {
        let hub = LoopbackHub::new();
        let err = hub
            .connect(&token(Some("a"), "elsewhere"), "a", CHANNEL)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MessagingError::Rejected(_)));

        let err = hub
            .connect(&token(Some("a"), CHANNEL), "b", CHANNEL)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MessagingError::Rejected(_)));

        assert!(hub.connect(&token(None, CHANNEL), "b", CHANNEL).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_fans_out_including_self() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        let bob = connect(&hub, "bob").await;
        let mut alice_rx = alice.subscribe().await.unwrap();
        let mut bob_rx = bob.subscribe().await.unwrap();

        alice.publish(MESSAGE_EVENT, json!({"text": "hi"})).await.unwrap();

        for rx in [&mut alice_rx, &mut bob_rx] {
            match rx.recv().await.unwrap() {
                ChannelEvent::Message(msg) => {
                    assert_eq!(msg.client_id.as_deref(), Some("alice"));
                    assert_eq!(msg.data["text"], "hi");
                    assert!(!msg.id.is_empty());
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        for i in 0..5 {
            alice
                .publish(MESSAGE_EVENT, json!({ "text": i }))
                .await
                .unwrap();
        }

        let history = alice.history(3).await.unwrap();
        let texts: Vec<i64> = history
            .iter()
            .map(|m| m.data["text"].as_i64().unwrap())
            .collect();
        assert_eq!(texts, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_history_retention_is_bounded() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        for i in 0..HISTORY_RETENTION + 5 {
            alice
                .publish(MESSAGE_EVENT, json!({ "text": i }))
                .await
                .unwrap();
        }

        let retained = hub.history_of(CHANNEL);
        assert_eq!(retained.len(), HISTORY_RETENTION);
        assert_eq!(retained[0].data["text"], 5);
        assert_eq!(
            retained[HISTORY_RETENTION - 1].data["text"],
            HISTORY_RETENTION + 4
        );
    }

    #[tokio::test]
    async fn test_presence_lifecycle() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        let mut rx = alice.subscribe().await.unwrap();

        alice.enter_presence(json!({"displayName": "Alice"})).await.unwrap();
        alice.update_presence(json!({"displayName": "Al"})).await.unwrap();
        assert_eq!(hub.present(CHANNEL), vec!["alice"]);

        let members = alice.presence_members().await.unwrap();
        assert_eq!(members[0].data["displayName"], "Al");

        alice.leave_presence().await.unwrap();
        assert!(hub.present(CHANNEL).is_empty());

        let actions: Vec<PresenceAction> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                ChannelEvent::Presence { action, .. } => Some(action),
                _ => None,
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                PresenceAction::Enter,
                PresenceAction::Update,
                PresenceAction::Leave
            ]
        );
    }

    #[tokio::test]
    async fn test_close_leaves_and_rejects_further_calls() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        let _rx = alice.subscribe().await.unwrap();
        alice.enter_presence(json!({})).await.unwrap();

        alice.close().await.unwrap();
        assert!(hub.present(CHANNEL).is_empty());
        assert_eq!(hub.subscriber_count(CHANNEL), 0);
        assert_eq!(
            alice.publish(MESSAGE_EVENT, json!({})).await,
            Err(MessagingError::Closed)
        );
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        hub.fail_next(Operation::Publish);

        assert!(alice.publish(MESSAGE_EVENT, json!({})).await.is_err());
        assert!(alice.publish(MESSAGE_EVENT, json!({})).await.is_ok());
        assert_eq!(hub.history_of(CHANNEL).len(), 1);
    }

    #[tokio::test]
    async fn test_connection_state_targets_one_client() {
        let hub = LoopbackHub::new();
        let alice = connect(&hub, "alice").await;
        let bob = connect(&hub, "bob").await;
        let mut alice_rx = alice.subscribe().await.unwrap();
        let mut bob_rx = bob.subscribe().await.unwrap();

        hub.set_connection_state("alice", ConnectionState::Disconnected);

        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ChannelEvent::Connection(ConnectionState::Disconnected)
        );
        assert!(bob_rx.try_recv().is_err());
    }
}
