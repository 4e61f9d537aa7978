//! API routes.

pub mod health;
pub mod reply;
pub mod token;

pub use health::{HealthResponse, health_routes};
pub use reply::{ReplyRequest, ReplyResponse, reply_handler};
pub use token::{TokenQuery, token_handler};
