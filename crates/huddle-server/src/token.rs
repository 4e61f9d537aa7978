//! Token issuance.
//!
//! The browser never sees the messaging backend's secret key. Instead it asks
//! this server for a signed *token request*: a short-lived, channel-scoped
//! grant that the backend exchanges for a real token. The signature is
//! `base64(HMAC-SHA256(secret, keyName\nttl\ncapability\nclientId\ntimestamp\nnonce\n))`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::DEFAULT_TOKEN_TIMEOUT;
use crate::error::{Result, ServerError};

/// Operations every token grants on the channel, sorted.
pub const CHANNEL_OPERATIONS: &[&str] = &["history", "presence", "publish", "subscribe"];

const NONCE_LEN: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Messaging Key
// ─────────────────────────────────────────────────────────────────────────────

/// A messaging backend key of the form `name:secret`.
#[derive(Clone)]
pub struct MessagingKey {
    name: String,
    secret: String,
}

impl MessagingKey {
    /// Parse a `name:secret` key.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let Some((name, secret)) = raw.split_once(':') else {
            return Err(ServerError::config(
                "Messaging key is malformed",
                "expected the form `name:secret`",
            ));
        };
        if name.is_empty() || secret.is_empty() {
            return Err(ServerError::config(
                "Messaging key is malformed",
                "key name and secret must both be non-empty",
            ));
        }
        Ok(Self {
            name: name.to_string(),
            secret: secret.to_string(),
        })
    }

    /// The public part of the key.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MessagingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingKey")
            .field("name", &self.name)
            .field("secret", &"***")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token Request
// ─────────────────────────────────────────────────────────────────────────────

/// A signed token request, serialized exactly as the messaging backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub key_name: String,
    /// Lifetime in milliseconds.
    pub ttl: u64,
    /// JSON-encoded capability map.
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub nonce: String,
    pub mac: String,
}

/// What a minted token should grant.
#[derive(Debug, Clone)]
pub struct TokenParams {
    pub client_id: Option<String>,
    pub channel: String,
    pub ttl: Duration,
}

impl TokenParams {
    /// JSON capability string for a single channel.
    pub fn capability(&self) -> String {
        let mut map = serde_json::Map::new();
        map.insert(self.channel.clone(), serde_json::json!(CHANNEL_OPERATIONS));
        serde_json::Value::Object(map).to_string()
    }
}

/// The credential-minting primitive.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    /// Mint a token request for the given parameters.
    async fn mint(&self, params: &TokenParams) -> Result<TokenRequest>;
}

/// Signs token requests locally with an HMAC of the key secret.
#[derive(Debug, Clone)]
pub struct SignedTokenMinter {
    key: MessagingKey,
}

impl SignedTokenMinter {
    pub fn new(key: MessagingKey) -> Self {
        Self { key }
    }

    /// Sign a token request with an explicit timestamp and nonce.
    pub fn sign(&self, params: &TokenParams, timestamp: i64, nonce: String) -> Result<TokenRequest> {
        let ttl = params.ttl.as_millis() as u64;
        let capability = params.capability();
        let client_id = params.client_id.as_deref().unwrap_or("");

        let text = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n",
            self.key.name, ttl, capability, client_id, timestamp, nonce
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(self.key.secret.as_bytes())
            .map_err(|e| ServerError::token_issue("Failed to sign token request", e.to_string()))?;
        mac.update(text.as_bytes());
        let signature =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok(TokenRequest {
            key_name: self.key.name.clone(),
            ttl,
            capability,
            client_id: params.client_id.clone(),
            timestamp,
            nonce,
            mac: signature,
        })
    }
}

#[async_trait]
impl TokenMinter for SignedTokenMinter {
    async fn mint(&self, params: &TokenParams) -> Result<TokenRequest> {
        let nonce: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.sign(params, timestamp, nonce)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token Issuer
// ─────────────────────────────────────────────────────────────────────────────

/// Key state captured at startup. A bad key never stops the server; it makes
/// every token request fail closed instead.
#[derive(Clone)]
enum MinterSlot {
    Ready(Arc<dyn TokenMinter>),
    Missing,
    Malformed(String),
}

/// Issues channel-scoped token requests.
#[derive(Clone)]
pub struct TokenIssuer {
    minter: MinterSlot,
    channel: String,
    ttl: Duration,
    timeout: Duration,
}

impl TokenIssuer {
    /// Build an issuer from a raw `name:secret` key, if one is configured.
    pub fn from_key(key: Option<&str>, channel: impl Into<String>, ttl: Duration) -> Self {
        let minter = match key.map(str::trim).filter(|k| !k.is_empty()) {
            None => MinterSlot::Missing,
            Some(raw) => match MessagingKey::parse(raw) {
                Ok(key) => MinterSlot::Ready(Arc::new(SignedTokenMinter::new(key))),
                Err(e) => {
                    let details = match &e {
                        ServerError::Config { details, .. } => details.clone().unwrap_or_default(),
                        other => other.to_string(),
                    };
                    tracing::warn!(%details, "Messaging key is malformed, token requests will fail");
                    MinterSlot::Malformed(details)
                }
            },
        };

        Self {
            minter,
            channel: channel.into(),
            ttl,
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }

    /// Build an issuer around a custom minter.
    pub fn with_minter(minter: Arc<dyn TokenMinter>, channel: impl Into<String>, ttl: Duration) -> Self {
        Self {
            minter: MinterSlot::Ready(minter),
            channel: channel.into(),
            ttl,
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }

    /// Set the bound on a single minting call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The channel tokens are scoped to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether a usable key is configured.
    pub fn is_ready(&self) -> bool {
        matches!(self.minter, MinterSlot::Ready(_))
    }

    /// Issue a token request for `client_id`.
    pub async fn issue(&self, client_id: Option<&str>) -> Result<TokenRequest> {
        let minter = match &self.minter {
            MinterSlot::Ready(minter) => minter,
            MinterSlot::Missing => {
                return Err(ServerError::config(
                    "Messaging key is not configured",
                    format!(
                        "set {} or [messaging].api_key",
                        huddle_config::secrets::MESSAGING_KEY_ENV
                    ),
                ));
            }
            MinterSlot::Malformed(details) => {
                return Err(ServerError::config("Messaging key is malformed", details.clone()));
            }
        };

        let params = TokenParams {
            client_id: client_id.map(str::to_string),
            channel: self.channel.clone(),
            ttl: self.ttl,
        };

        match tokio::time::timeout(self.timeout, minter.mint(&params)).await {
            Ok(result) => result,
            Err(_) => Err(ServerError::token_issue(
                "Token request timed out",
                format!("minting did not finish within {:?}", self.timeout),
            )),
        }
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ready", &self.is_ready())
            .field("channel", &self.channel)
            .field("ttl", &self.ttl)
            .finish()
    }
}
