//! Token command - fetches a signed token request from the server.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the token command.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Client id the token is bound to
    #[arg(required = true)]
    pub client_id: String,
}

/// Run the token command.
pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    let token = match client.tokens().request(&args.client_id).await {
        Ok(token) => token,
        Err(e) => {
            if let huddle_client::Error::Api {
                details: Some(ref details),
                ..
            } = e
            {
                eprintln!("{} {}", Style::new().dim().apply_to("Details:"), details);
            }
            return Err(e.into());
        }
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&token)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("  {} {}", dim.apply_to("Key:"), token.key_name);
    println!(
        "  {} {}",
        dim.apply_to("Client:"),
        token.client_id.as_deref().unwrap_or("(anonymous)")
    );
    println!("  {} {}", dim.apply_to("Capability:"), token.capability);
    println!("  {} {}s", dim.apply_to("TTL:"), token.ttl / 1000);
    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Nonce:"), token.nonce);
        println!("  {} {}", dim.apply_to("MAC:"), token.mac);
    }

    Ok(())
}
