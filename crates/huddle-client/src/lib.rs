//! Client SDK for Huddle.
//!
//! Three layers:
//!
//! - [`HuddleClient`]: typed HTTP client for the server's token, reply and
//!   health endpoints.
//! - [`Messaging`] / [`ChannelHandle`]: the narrow surface of the hosted
//!   publish/subscribe service, with an in-process [`LoopbackHub`].
//! - [`ChatSession`]: the controller that ties both together for one channel.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use huddle_client::{ChatSession, HuddleClient, LoopbackHub, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HuddleClient::builder().base_url("http://localhost:8080").build()?);
//!
//! let mut session = ChatSession::new(
//!     client.clone(),
//!     client,
//!     Arc::new(LoopbackHub::new()),
//!     SessionConfig::default(),
//!     Some("Ada"),
//! );
//! session.initialize().await?;
//! session.send_message("Hello!").await?;
//!
//! while let Some(event) = session.next_event().await {
//!     session.handle_event(event).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod loopback;
pub mod messaging;
pub mod names;
pub mod session;
pub mod state;
pub mod types;

pub use client::{ClientBuilder, HuddleClient};
pub use error::{Error, Result};
pub use loopback::{LoopbackHub, Operation};
pub use messaging::{
    ChannelEvent, ChannelHandle, ConnectionState, InboundMessage, MESSAGE_EVENT, Messaging,
    MessagingError, MessagingResult, PresenceAction, PresenceMessage,
};
pub use names::{GUEST_PREFIX, guest_name, normalize_display_name};
pub use session::{
    ASSISTANT_SENDER, ChatSession, DEFAULT_CHANNEL, HISTORY_LIMIT, ReplyProvider, SendOutcome,
    SessionConfig, SessionError, SessionResult, TokenSource,
};
pub use state::SessionState;
pub use types::*;
