//! API endpoint implementations.

mod health;
mod reply;
mod token;

pub use health::HealthApi;
pub use reply::ReplyApi;
pub use token::TokenApi;
