//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use huddle_llm::{HttpBackend, HttpBackendConfig, MockBackend, MockResponse, ReplyService};
use huddle_server::{AppState, Server, ServerConfig, TokenIssuer};

/// Key used by servers that should issue tokens.
pub const TEST_KEY: &str = "test.key:test-secret";

/// Channel every test server scopes tokens to.
pub const TEST_CHANNEL: &str = "test-chat";

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with a valid key and the echo reply backend.
    pub async fn start() -> Result<Self> {
        Self::start_with(Some(TEST_KEY), ReplyService::mock()).await
    }

    /// Start a test server whose reply backend returns the given bodies in order.
    pub async fn start_with_bodies(bodies: Vec<&str>) -> Result<Self> {
        let responses = bodies.into_iter().map(MockResponse::body).collect();
        let backend = Arc::new(MockBackend::new(responses));
        Self::start_with(Some(TEST_KEY), ReplyService::new(backend)).await
    }

    /// Start a test server that proxies replies to a real HTTP endpoint.
    pub async fn start_with_endpoint(endpoint: &str, reply_timeout: Duration) -> Result<Self> {
        let backend = HttpBackend::new(HttpBackendConfig::new(endpoint).with_model("test-model"))?;
        let replies = ReplyService::new(Arc::new(backend)).with_timeout(reply_timeout);
        Self::start_with(Some(TEST_KEY), replies).await
    }

    /// Start a test server with an explicit key and reply service.
    pub async fn start_with(key: Option<&str>, replies: ReplyService) -> Result<Self> {
        let addr = find_available_port().await?;

        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);
        let tokens = TokenIssuer::from_key(key, TEST_CHANNEL, Duration::from_secs(3600));
        let server = Server::from_state(AppState::new(config, replies, tokens));

        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// GET request builder.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// POST request builder.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Check if server is healthy.
    pub async fn health(&self) -> Result<bool> {
        let resp = self.get("/health").send().await?;
        Ok(resp.status().is_success())
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
