//! HTTP server for Huddle.
//!
//! Two endpoints back the chat client:
//!
//! - `GET /api/token?clientId=...` issues a channel-scoped token request for
//!   the messaging backend, so the backend key never leaves the server.
//! - `POST /api/reply` turns a chat message into exactly one AI reply string.
//!
//! Plus `GET /health`, request logging, CORS, a body size limit and panic
//! recovery.
//!
//! # Example
//!
//! ```ignore
//! use huddle_server::{AppState, Server, ServerConfig, TokenIssuer};
//! use huddle_llm::ReplyService;
//!
//! let tokens = TokenIssuer::from_key(Some("app.key:secret"), "huddle-chat", ttl);
//! let state = AppState::new(ServerConfig::new(), ReplyService::mock(), tokens);
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod token;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use middleware::{handle_panic, request_logging_middleware};
pub use routes::{HealthResponse, ReplyRequest, ReplyResponse};
pub use state::AppState;
pub use token::{
    MessagingKey, SignedTokenMinter, TokenIssuer, TokenMinter, TokenParams, TokenRequest,
};

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Huddle HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::{get, post};

        let mut router = Router::new()
            .merge(routes::health_routes())
            .route("/api/token", get(routes::token_handler))
            .route("/api/reply", post(routes::reply_handler))
            .layer(RequestBodyLimitLayer::new(self.state.config.max_body_size))
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                middleware::request_logging_middleware,
            ))
            // Panics become 500s before the logging layer sees the response
            .layer(CatchPanicLayer::custom(middleware::handle_panic));

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// CORS layer for the configured origins, if any.
    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        if origins.is_empty() {
            return None;
        }

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
    }

    /// Run the server until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_until(addr, shutdown_signal()).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.run_until(addr, std::future::pending()).await
    }

    /// Run the server on `addr` until `shutdown` resolves.
    pub async fn run_until<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!(
            addr = %addr,
            channel = %self.state.tokens.channel(),
            tokens_ready = self.state.tokens.is_ready(),
            reply_backend = %self.state.replies.backend_name(),
            "Starting server"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
