//! Auth commands - manage stored credentials.

use anyhow::{Result, bail};
use ccapi_core::{TokenBundle, TokenStore};
use clap::Args;
use tracing::info;

use super::Session;
use crate::output::{JsonFormatter, StatusOutput, TextFormatter, TokenOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Access token issued by the backend.
    #[arg(long)]
    pub access_token: String,

    /// Refresh token issued by the backend.
    #[arg(long)]
    pub refresh_token: Option<String>,
}

/// Stores a token pair.
pub async fn login(args: &LoginArgs, cli: &Cli) -> Result<()> {
    if args.access_token.trim().is_empty() {
        bail!("Access token is empty");
    }

    let session = Session::open(cli).await?;
    let bundle = TokenBundle::new(args.access_token.trim(), args.refresh_token.clone());
    session.store.set(bundle).await;
    info!(backend = %session.backend, "Tokens stored");

    print_token(&session, cli).await
}

/// Removes stored tokens.
pub async fn logout(cli: &Cli) -> Result<()> {
    let session = Session::open(cli).await?;
    session.store.clear().await;
    info!(backend = %session.backend, "Tokens cleared");

    print_token(&session, cli).await
}

/// Prints the stored token, masked.
pub async fn token(cli: &Cli) -> Result<()> {
    let session = Session::open(cli).await?;
    print_token(&session, cli).await
}

/// Prints origin, context and token state.
pub async fn status(cli: &Cli) -> Result<()> {
    let session = Session::open(cli).await?;
    let config = session.client.config();

    let status = StatusOutput {
        context: config.context.label().to_string(),
        build_id: config.build_id.clone(),
        origin: session.client.origin().to_string(),
        dev_mode: config.dev_mode,
        token: token_output(&session).await,
    };

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_status(&status));
        }
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&status)?),
    }
    Ok(())
}

async fn token_output(session: &Session) -> TokenOutput {
    let bundle = session.store.get().await;
    TokenOutput {
        backend: session.backend.to_string(),
        signed_in: bundle.as_ref().is_some_and(TokenBundle::has_access_token),
        access_token: bundle
            .as_ref()
            .filter(|b| b.has_access_token())
            .map(TokenBundle::masked_access_token),
        has_refresh_token: bundle
            .as_ref()
            .and_then(TokenBundle::usable_refresh_token)
            .is_some(),
    }
}

async fn print_token(session: &Session, cli: &Cli) -> Result<()> {
    let output = token_output(session).await;

    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(&output)?),
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let label = match &output.access_token {
                Some(masked) => format!("signed in ({masked})"),
                None => "signed out".to_string(),
            };
            println!("{}", formatter.check(output.signed_in, &label));
            if output.signed_in {
                println!(
                    "{}",
                    formatter.check(output.has_refresh_token, "refresh token")
                );
            }
            println!("Backend: {}", output.backend);
        }
    }
    Ok(())
}
