//! Server configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{Result, ServerError};

/// Default max body size for REST requests (64 KB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Bound on a single token-minting call.
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,

    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,

    /// Maximum REST request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], huddle_config::DEFAULT_PORT)),
            request_logging: true,
            cors_origins: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create a server config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[server]` section of the loaded configuration.
    pub fn from_settings(settings: &huddle_config::ServerConfig) -> Result<Self> {
        let ip: IpAddr = settings.bind.trim().parse().map_err(|e| {
            ServerError::config(
                format!("Invalid bind address '{}'", settings.bind),
                format!("{}", e),
            )
        })?;

        Ok(Self {
            bind_address: SocketAddr::new(ip, settings.port),
            request_logging: settings.request_logging,
            cors_origins: settings.cors_origins.clone(),
            ..Self::default()
        })
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set CORS allowed origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Set the maximum REST request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = huddle_config::ServerConfig {
            port: 9100,
            bind: "0.0.0.0".to_string(),
            request_logging: false,
            cors_origins: vec!["http://localhost:5173".to_string()],
        };
        let config = ServerConfig::from_settings(&settings).unwrap();
        assert_eq!(config.bind_address.port(), 9100);
        assert!(config.bind_address.ip().is_unspecified());
        assert!(!config.request_logging);
        assert_eq!(config.cors_origins.len(), 1);
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_from_settings_accepts_ipv6_bind() {
        let settings = huddle_config::ServerConfig {
            port: 8080,
            bind: "::1".to_string(),
            ..Default::default()
        };
        let config = ServerConfig::from_settings(&settings).unwrap();
        assert!(config.bind_address.is_ipv6());
        assert!(config.bind_address.ip().is_loopback());
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.bind_address.to_string(), "[::1]:8080");
    }

    #[test]
    fn test_from_settings_rejects_bad_bind() {
        let settings = huddle_config::ServerConfig {
            bind: "not-an-ip".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::from_settings(&settings),
            Err(ServerError::Config { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::new()
            .with_bind_address("127.0.0.1:0".parse().unwrap())
            .with_request_logging(false)
            .with_max_body_size(10);
        assert_eq!(config.bind_address.port(), 0);
        assert!(!config.request_logging);
        assert_eq!(config.max_body_size, 10);
    }
}
