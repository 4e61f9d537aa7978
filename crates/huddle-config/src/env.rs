//! Environment overrides applied on top of file configuration.
//!
//! | Variable | Effect |
//! |---|---|
//! | `HUDDLE_COMPLETION_URL` | `completion.endpoint` |
//! | `HUDDLE_COMPLETION_MODEL` | `completion.model` |
//! | `HUDDLE_COMPLETION_TEMPERATURE` | `completion.temperature` |
//! | `HUDDLE_COMPLETION_MAX_TOKENS` | `completion.max_tokens` |
//! | `HUDDLE_MOCK_REPLY` | `completion.mock` |
//! | `HUDDLE_CHANNEL` | `messaging.channel` |
//!
//! Keys are not copied into the config; they go through [`crate::secrets`].

use crate::{ConfigError, HuddleConfig, Result};

pub const COMPLETION_URL_ENV: &str = "HUDDLE_COMPLETION_URL";
pub const COMPLETION_MODEL_ENV: &str = "HUDDLE_COMPLETION_MODEL";
pub const COMPLETION_TEMPERATURE_ENV: &str = "HUDDLE_COMPLETION_TEMPERATURE";
pub const COMPLETION_MAX_TOKENS_ENV: &str = "HUDDLE_COMPLETION_MAX_TOKENS";
pub const MOCK_REPLY_ENV: &str = "HUDDLE_MOCK_REPLY";
pub const CHANNEL_ENV: &str = "HUDDLE_CHANNEL";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut HuddleConfig) -> Result<()> {
    apply_env_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using an explicit lookup (tests pass a map).
///
/// Blank values are ignored. Unparseable numbers or flags are errors rather
/// than silently dropped.
pub fn apply_env_overrides_from<F>(config: &mut HuddleConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(COMPLETION_URL_ENV) {
        config.completion_mut().endpoint = url.trim().to_string();
    }

    if let Some(model) = get(COMPLETION_MODEL_ENV) {
        config.completion_mut().model = model.trim().to_string();
    }

    if let Some(raw) = get(COMPLETION_TEMPERATURE_ENV) {
        let temperature = raw
            .trim()
            .parse::<f32>()
            .map_err(|_| invalid(COMPLETION_TEMPERATURE_ENV, &raw, "a number"))?;
        config.completion_mut().temperature = Some(temperature);
    }

    if let Some(raw) = get(COMPLETION_MAX_TOKENS_ENV) {
        let max_tokens = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(COMPLETION_MAX_TOKENS_ENV, &raw, "a positive integer"))?;
        config.completion_mut().max_tokens = Some(max_tokens);
    }

    if let Some(raw) = get(MOCK_REPLY_ENV) {
        let mock = parse_flag(&raw).ok_or_else(|| invalid(MOCK_REPLY_ENV, &raw, "a boolean"))?;
        config.completion_mut().mock = mock;
    }

    if let Some(channel) = get(CHANNEL_ENV) {
        config.messaging_mut().channel = channel.trim().to_string();
    }

    Ok(())
}

/// Parse a boolean-like flag (`1/true/yes/on`, `0/false/no/off`).
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(var: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(vars: &[(&str, &str)]) -> Result<HuddleConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = HuddleConfig::new();
        apply_env_overrides_from(&mut config, |key| map.get(key).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_no_vars_leaves_config_untouched() {
        let config = apply(&[]).unwrap();
        assert_eq!(config, HuddleConfig::new());
    }

    #[test]
    fn test_overrides_completion_fields() {
        let config = apply(&[
            (COMPLETION_URL_ENV, "http://localhost:9999/v1/chat"),
            (COMPLETION_MODEL_ENV, "tiny"),
            (COMPLETION_TEMPERATURE_ENV, "0.2"),
            (COMPLETION_MAX_TOKENS_ENV, "64"),
            (MOCK_REPLY_ENV, "yes"),
        ])
        .unwrap();

        let completion = config.completion();
        assert_eq!(completion.endpoint, "http://localhost:9999/v1/chat");
        assert_eq!(completion.model, "tiny");
        assert_eq!(completion.temperature, Some(0.2));
        assert_eq!(completion.max_tokens, Some(64));
        assert!(completion.mock);
    }

    #[test]
    fn test_overrides_channel() {
        let config = apply(&[(CHANNEL_ENV, "lobby")]).unwrap();
        assert_eq!(config.messaging().channel, "lobby");
    }

    #[test]
    fn test_invalid_flag_is_error() {
        let err = apply(&[(MOCK_REPLY_ENV, "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
        assert!(err.to_string().contains(MOCK_REPLY_ENV));
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = apply(&[(COMPLETION_MAX_TOKENS_ENV, "-3")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_parse_flag_variants() {
        for v in ["1", "true", "TRUE", " yes ", "on"] {
            assert_eq!(parse_flag(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "off"] {
            assert_eq!(parse_flag(v), Some(false), "{v}");
        }
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("enabled"), None);
    }
}
