//! Start command - launches the Huddle server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use huddle_config::secrets::{COMPLETION_KEY_ENV, MESSAGING_KEY_ENV};
use huddle_config::{
    CompletionConfig, HuddleConfig, LoadedConfig, ResolvedSecret, SecretSource, resolve_secret,
};
use huddle_llm::{HttpBackend, HttpBackendConfig, ReplyService};
use huddle_server::{AppState, Server, ServerConfig, TokenIssuer};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override environment variables, which override config files.
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Messaging backend key as name:secret (or set HUDDLE_MESSAGING_KEY)
    #[arg(long)]
    pub messaging_key: Option<String>,

    /// Completion endpoint URL (overrides config)
    #[arg(long)]
    pub completion_url: Option<String>,

    /// Completion model (overrides config)
    #[arg(long)]
    pub model: Option<String>,

    /// Answer with canned echo replies instead of calling the endpoint
    #[arg(long)]
    pub mock: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let loaded = match &args.config {
        Some(path) => LoadedConfig::from_file(path)?,
        None => huddle_config::load_config(None)?,
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    if ctx.verbose {
        let sources = loaded.loaded_from();
        if sources.is_empty() {
            println!("No config files found, using defaults + CLI args");
        } else {
            for source in sources {
                println!("Loaded config: {}", source.display());
            }
        }
    }

    let mut config = loaded.config;
    huddle_config::apply_env_overrides(&mut config)?;
    apply_cli_overrides(&mut config, &args);

    // ── Build components ────────────────────────────────────────────────

    let server_config = ServerConfig::from_settings(&config.server())?;
    let messaging = config.messaging();

    let messaging_key = resolve_messaging_key(&args, messaging.api_key.as_deref());
    match &messaging_key {
        Some(key) if ctx.verbose => println!("Messaging key from: {}", key.source),
        Some(_) => {}
        None => eprintln!(
            "warning: no messaging key configured (set {}); token requests will fail",
            MESSAGING_KEY_ENV
        ),
    }

    let tokens = TokenIssuer::from_key(
        messaging_key.as_ref().map(|k| k.value.as_str()),
        &messaging.channel,
        Duration::from_secs(messaging.token_ttl_secs),
    );

    let completion = config.completion();
    let replies = build_reply_service(&completion)?;

    if ctx.verbose {
        println!("Channel: {}", messaging.channel);
        println!("Reply backend: {}", replies.backend_name());
        if !completion.mock {
            println!("Completion endpoint: {}", completion.endpoint);
            println!("Model: {}", completion.model);
        }
        println!("Reply timeout: {}s", replies.timeout().as_secs());
    }

    // ── Run ─────────────────────────────────────────────────────────────

    let server = Server::from_state(AppState::new(server_config, replies, tokens));
    let addr = server.bind_address();

    println!("Huddle server starting on http://{}", addr);
    println!("Press Ctrl+C to stop");

    server.run().await?;
    Ok(())
}

/// Apply command-line overrides on top of file and environment config.
fn apply_cli_overrides(config: &mut HuddleConfig, args: &StartArgs) {
    if let Some(port) = args.port {
        config.server_mut().port = port;
    }
    if let Some(ref bind) = args.bind {
        config.server_mut().bind = bind.clone();
    }
    if let Some(ref url) = args.completion_url {
        config.completion_mut().endpoint = url.clone();
    }
    if let Some(ref model) = args.model {
        config.completion_mut().model = model.clone();
    }
    if args.mock {
        config.completion_mut().mock = true;
    }
}

/// The messaging key from the flag, the environment, or the config file.
fn resolve_messaging_key(args: &StartArgs, config_value: Option<&str>) -> Option<ResolvedSecret> {
    if let Some(key) = args.messaging_key.as_deref().map(str::trim)
        && !key.is_empty()
    {
        return Some(ResolvedSecret {
            value: key.to_string(),
            source: SecretSource::Cli,
        });
    }
    resolve_secret(MESSAGING_KEY_ENV, config_value)
}

/// Build the reply service for the `[completion]` section.
fn build_reply_service(completion: &CompletionConfig) -> Result<ReplyService> {
    let timeout = completion.reply_timeout();
    if completion.mock {
        return Ok(ReplyService::mock().with_timeout(timeout));
    }

    let mut backend_config =
        HttpBackendConfig::new(&completion.endpoint).with_model(&completion.model);
    if let Some(key) = resolve_secret(COMPLETION_KEY_ENV, completion.api_key.as_deref()) {
        backend_config = backend_config.with_api_key(key.value);
    }
    if let Some(temperature) = completion.temperature {
        backend_config = backend_config.with_temperature(temperature);
    }
    if let Some(max_tokens) = completion.max_tokens {
        backend_config = backend_config.with_max_tokens(max_tokens);
    }
    if let Some(ref prompt) = completion.system_prompt {
        backend_config = backend_config.with_system_prompt(prompt);
    }

    let backend = HttpBackend::new(backend_config)?;
    Ok(ReplyService::new(Arc::new(backend)).with_timeout(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let mut config = HuddleConfig::new();
        let args = StartArgs {
            port: Some(9090),
            bind: Some("0.0.0.0".to_string()),
            completion_url: Some("http://localhost:11434/v1/chat/completions".to_string()),
            model: Some("llama3".to_string()),
            mock: true,
            ..Default::default()
        };
        apply_cli_overrides(&mut config, &args);

        assert_eq!(config.server().port, 9090);
        assert_eq!(config.server().bind, "0.0.0.0");
        assert_eq!(config.completion().model, "llama3");
        assert!(config.completion().mock);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = HuddleConfig::from_toml("[server]\nport = 7000\n").unwrap();
        apply_cli_overrides(&mut config, &StartArgs::default());
        assert_eq!(config.server().port, 7000);
        assert!(!config.completion().mock);
    }

    #[test]
    fn test_flag_key_takes_precedence() {
        let args = StartArgs {
            messaging_key: Some(" app.key:secret ".to_string()),
            ..Default::default()
        };
        let key = resolve_messaging_key(&args, Some("file.key:other")).unwrap();
        assert_eq!(key.value, "app.key:secret");
        assert_eq!(key.source, SecretSource::Cli);
    }

    #[test]
    fn test_mock_reply_service() {
        let completion = CompletionConfig {
            mock: true,
            timeout_secs: 5,
            ..Default::default()
        };
        let service = build_reply_service(&completion).unwrap();
        assert_eq!(service.timeout(), Duration::from_secs(5));
        assert_eq!(service.backend_name(), "mock");
    }

    #[test]
    fn test_long_timeout_is_capped() {
        let completion = CompletionConfig {
            mock: true,
            timeout_secs: 300,
            ..Default::default()
        };
        let service = build_reply_service(&completion).unwrap();
        assert_eq!(
            service.timeout(),
            Duration::from_secs(huddle_config::MAX_REPLY_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let completion = CompletionConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(build_reply_service(&completion).is_err());
    }
}
