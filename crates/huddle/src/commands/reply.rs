//! Reply command - one-shot question to the AI reply proxy.

use anyhow::Result;
use clap::Args;
use console::Style;
use huddle_client::ReplyRequest;

use super::Context;

/// Arguments for the reply command.
#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// The message to send
    #[arg(required = true)]
    pub message: String,
}

/// Run the reply command.
pub async fn run(args: ReplyArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    if ctx.verbose {
        let dim = Style::new().dim();
        println!(
            "{}",
            dim.apply_to(format!("Sending to: {}", ctx.server_url))
        );
    }

    let response = client
        .reply()
        .send(&ReplyRequest {
            message: args.message,
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.reply);
    }

    Ok(())
}
