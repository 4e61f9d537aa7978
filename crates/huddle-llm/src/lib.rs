//! AI reply normalization for Huddle.
//!
//! One chat message goes in, exactly one reply string comes out. The
//! upstream completion service may time out, refuse, rate limit, or answer
//! in whatever JSON shape it likes; none of that reaches the caller.
//!
//! ```text
//! ┌───────────────┐   raw body   ┌──────────────┐   text    ┌───────────┐
//! │ Completion-   │ ───────────▶ │ extract      │ ────────▶ │  Reply    │
//! │ Backend       │              │ (strategies) │           │           │
//! └───────────────┘              └──────────────┘           └───────────┘
//!         │ LlmError / timeout                                    ▲
//!         └────────────────────▶ Fallback ────────────────────────┘
//! ```
//!
//! [`ReplyService`] ties the pieces together and owns the 30 second bound.

pub mod backend;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod http;
pub mod reply;

pub use backend::{CompletionBackend, MockBackend, MockResponse, SharedBackend};
pub use error::{LlmError, Result};
pub use extract::{Extraction, STRATEGIES, Strategy, extract_body, extract_reply};
pub use fallback::Fallback;
pub use http::{HttpBackend, HttpBackendConfig};
pub use reply::{DEFAULT_REPLY_TIMEOUT, Reply, ReplyService, ReplySource};
