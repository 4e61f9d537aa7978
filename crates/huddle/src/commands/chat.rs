//! Chat command - joins the channel from the terminal.
//!
//! Tokens and replies come from the running server. Messages travel through
//! the in-process loopback hub, so this is a single-terminal demo of the
//! session controller rather than a client of the hosted backend.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use huddle_client::{
    ASSISTANT_SENDER, ChannelEvent, ChatMessage, ChatSession, DEFAULT_CHANNEL, LoopbackHub,
    SessionConfig,
};

use super::Context;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Display name (default: a random guest name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Channel to join
    #[arg(short, long, default_value = DEFAULT_CHANNEL)]
    pub channel: String,
}

enum ControlFlow {
    Continue,
    Exit,
}

/// Run the chat command.
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let client = Arc::new(ctx.client()?);
    let hub = LoopbackHub::new();

    let mut session = ChatSession::new(
        client.clone(),
        client,
        Arc::new(hub),
        SessionConfig::default().with_channel(&args.channel),
        args.name.as_deref(),
    );

    debug!(channel = %args.channel, server = %ctx.server_url, "Joining chat");
    if let Err(e) = session.initialize().await {
        print_error(&format!("Could not join {}: {}", args.channel, e));
        return Err(e.into());
    }

    print_welcome(&session);
    let mut shown = print_new_messages(&session, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.starts_with('/') {
                    match handle_slash_command(&mut session, line).await {
                        ControlFlow::Continue => continue,
                        ControlFlow::Exit => break,
                    }
                }
                if let Err(e) = session.send_message(line).await {
                    warn!(error = %e, "Message not sent");
                    print_error(&e.to_string());
                    session.dismiss_notice();
                }
                session.pump().await;
                shown = print_new_messages(&session, shown);
            }
            event = session.next_event() => {
                let Some(event) = event else {
                    print_dim("Subscription closed");
                    break;
                };
                let is_connection = matches!(event, ChannelEvent::Connection(_));
                session.handle_event(event).await;
                if is_connection {
                    print_dim(&format!("Connection {}", session.status()));
                }
                if let Some(notice) = session.dismiss_notice() {
                    print_error(&notice);
                }
                shown = print_new_messages(&session, shown);
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    session.teardown().await;
    print_dim("Goodbye!");
    Ok(())
}

async fn handle_slash_command(session: &mut ChatSession, input: &str) -> ControlFlow {
    let (cmd, rest) = input[1..]
        .split_once(char::is_whitespace)
        .unwrap_or((&input[1..], ""));

    match cmd {
        "quit" | "q" | "exit" => return ControlFlow::Exit,
        "name" => {
            if rest.trim().is_empty() {
                println!("You are {}", style(session.display_name()).cyan());
            } else {
                session.set_display_name(rest).await;
                print_dim(&format!("You are now {}", session.display_name()));
            }
        }
        "who" => {
            session.pump().await;
            let dim = Style::new().dim();
            println!("{}", dim.apply_to(format!("{} online", session.roster().len())));
            for member in session.roster() {
                println!("  {}", member.label());
            }
        }
        "help" | "h" | "?" => print_help(),
        _ => {
            print_error(&format!("Unknown command: /{}", cmd));
            print_dim("Type /help for available commands");
        }
    }
    ControlFlow::Continue
}

/// Print messages after index `shown`, returning the new count.
fn print_new_messages(session: &ChatSession, shown: usize) -> usize {
    let messages = session.messages();
    for message in messages.iter().skip(shown) {
        print_message(message, session.display_name());
    }
    messages.len()
}

fn print_message(message: &ChatMessage, me: &str) {
    let dim = Style::new().dim();
    let time = chrono::DateTime::from_timestamp_millis(message.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .unwrap_or_default();

    let sender = if message.sender == ASSISTANT_SENDER {
        style(message.sender.as_str()).magenta().bold()
    } else if message.sender == me {
        style(message.sender.as_str()).green().bold()
    } else {
        style(message.sender.as_str()).cyan().bold()
    };

    println!("{} {}: {}", dim.apply_to(time), sender, message.text);
}

fn print_welcome(session: &ChatSession) {
    let dim = Style::new().dim();
    println!();
    println!("{}", style("Huddle Chat").bold().cyan());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!(
        "{}",
        dim.apply_to(format!(
            "Joined {} as {}",
            session.config().channel,
            session.display_name()
        ))
    );
    println!(
        "{}",
        dim.apply_to("Type a message and press Enter. /help lists commands.")
    );
    println!();
}

fn print_help() {
    let dim = Style::new().dim();
    println!();
    println!("{}", style("Available Commands").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {}  - Change your display name", style("/name <name>").cyan());
    println!("  {}  - Show who is online", style("/who").cyan());
    println!("  {}  - Exit the chat", style("/quit, /q").cyan());
    println!("  {}  - Show this help", style("/help, /h, /?").cyan());
    println!();
}

fn print_dim(text: &str) {
    println!("{}", Style::new().dim().apply_to(text));
}

fn print_error(text: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), text);
}
