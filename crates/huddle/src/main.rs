//! Huddle - real-time chat with an AI participant
//!
//! Main entry point for the Huddle CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{chat, reply, start, status, token};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Huddle - real-time chat with an AI participant
#[derive(Parser)]
#[command(name = "huddle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://localhost:8080)
    #[arg(long, global = true, env = "HUDDLE_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Huddle server
    Start(start::StartArgs),

    /// Show server status
    Status(status::StatusArgs),

    /// Fetch a messaging token request for a client id
    Token(token::TokenArgs),

    /// Ask the AI reply proxy a one-shot question
    Reply(reply::ReplyArgs),

    /// Join the chat channel from the terminal
    Chat(chat::ChatArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "huddle=debug,huddle_client=debug,huddle_llm=debug,huddle_server=debug,huddle_config=debug,info"
    } else {
        "huddle=info,huddle_llm=info,huddle_server=info,warn"
    };

    let log_dir = huddle_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "huddle.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "huddle=trace,huddle_client=trace,huddle_llm=trace,huddle_server=trace,huddle_config=trace,info",
                )),
        )
        .init();

    let server_url = cli
        .server
        .unwrap_or_else(|| format!("http://localhost:{}", huddle_config::DEFAULT_PORT));

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Token(args) => token::run(args, &ctx).await,
        Commands::Reply(args) => reply::run(args, &ctx).await,
        Commands::Chat(args) => chat::run(args, &ctx).await,
    }
}
