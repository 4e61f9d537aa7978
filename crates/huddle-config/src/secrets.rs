//! Secret resolution for the messaging backend key and the completion key.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning)

/// Environment variable holding the messaging backend key (`name:secret`).
pub const MESSAGING_KEY_ENV: &str = "HUDDLE_MESSAGING_KEY";

/// Environment variable holding the completion endpoint bearer key.
pub const COMPLETION_KEY_ENV: &str = "HUDDLE_COMPLETION_API_KEY";

/// Result of secret resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
    /// Command-line flag.
    Cli,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
            SecretSource::Cli => write!(f, "command line"),
        }
    }
}

/// Resolve a secret from the process environment, then the config value.
pub fn resolve_secret(env_var: &str, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_secret_from(|key| std::env::var(key).ok(), env_var, config_value)
}

/// Resolve a secret with an explicit environment lookup.
///
/// Empty values are treated as unset at every layer.
pub fn resolve_secret_from<F>(
    lookup: F,
    env_var: &str,
    config_value: Option<&str>,
) -> Option<ResolvedSecret>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(env_var)
        && !value.trim().is_empty()
    {
        return Some(ResolvedSecret {
            value: value.trim().to_string(),
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_wins_over_config() {
        let resolved = resolve_secret_from(
            |key| (key == MESSAGING_KEY_ENV).then(|| "env.key:secret".to_string()),
            MESSAGING_KEY_ENV,
            Some("file.key:secret"),
        )
        .unwrap();

        assert_eq!(resolved.value, "env.key:secret");
        assert_eq!(
            resolved.source,
            SecretSource::EnvVar(MESSAGING_KEY_ENV.to_string())
        );
    }

    #[test]
    fn test_resolve_from_config_value() {
        let resolved = resolve_secret_from(no_env, MESSAGING_KEY_ENV, Some("my-key")).unwrap();
        assert_eq!(resolved.value, "my-key");
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let resolved = resolve_secret_from(
            |_| Some("   ".to_string()),
            COMPLETION_KEY_ENV,
            Some(""),
        );
        assert!(resolved.is_none());
    }

    #[test]
    fn test_secret_source_display() {
        assert_eq!(
            SecretSource::EnvVar("HUDDLE_MESSAGING_KEY".to_string()).to_string(),
            "env var HUDDLE_MESSAGING_KEY"
        );
        assert_eq!(
            SecretSource::ConfigFile.to_string(),
            "config file (plaintext)"
        );
        assert_eq!(SecretSource::Cli.to_string(), "command line");
    }
}
