//! HTTP completion backend.
//!
//! Sends an OpenAI-compatible chat completions body to a single configured
//! endpoint. Services that answer in another shape (Ollama, text-generation
//! servers, in-house proxies) still work because the response is never
//! deserialized into a fixed type here.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use std::time::Duration;

use crate::backend::CompletionBackend;
use crate::error::{LlmError, Result};

/// Default OpenAI-compatible chat completions URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Transport-level timeout. The reply bound is enforced by
/// [`crate::ReplyService`]; this only stops a leaked connection.
const TRANSPORT_TIMEOUT_SECS: u64 = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Full URL of the completion endpoint.
    pub endpoint: String,

    /// Bearer key (optional for local services).
    pub api_key: Option<String>,

    /// Model to request.
    pub model: String,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Completion token budget.
    pub max_tokens: Option<u32>,

    /// System prompt sent ahead of the user's message.
    pub system_prompt: Option<String>,

    /// Name for this backend instance.
    pub name: String,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            name: "http".to_string(),
        }
    }
}

impl HttpBackendConfig {
    /// Create a config for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the bearer key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Completion backend that POSTs to a configured endpoint.
pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        reqwest::Url::parse(&config.endpoint).map_err(|e| {
            LlmError::Config(format!("Invalid completion endpoint '{}': {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(TRANSPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// The configuration this backend was built with.
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn build_request<'a>(&'a self, message: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.config.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: message,
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(header::CONTENT_TYPE, "application/json");

        if let Some(ref api_key) = self.config.api_key {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", api_key))
        } else {
            builder
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, message: &str) -> Result<String> {
        let body = serde_json::to_vec(&self.build_request(message))?;

        tracing::debug!(
            backend = %self.config.name,
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            "Sending completion request"
        );

        let response = self
            .add_headers(self.client.post(&self.config.endpoint))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        let text = response.text().await.unwrap_or_default();

        tracing::warn!(
            backend = %self.config.name,
            status = status.as_u16(),
            "Completion endpoint returned an error status"
        );

        Err(LlmError::from_status(status.as_u16(), text))
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
