// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! ccapi CLI - resilient backend requests from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Store credentials
//! ccapi login --access-token eyJ... --refresh-token r-1
//!
//! # Authenticated GET (prints null when signed out)
//! ccapi get dashboard
//!
//! # Mutating request with a JSON body
//! ccapi post rewards/claim --data '{"kind":"daily"}'
//!
//! # Multipart upload
//! ccapi post profile/avatar --form name=me --form file=@avatar.png
//!
//! # JSON output
//! ccapi --format json --pretty status
//! ```

mod commands;
mod output;

use anyhow::Result;
use ccapi_core::HttpMethod;
use ccapi_fetch::ApiError;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{auth, config, request};

// ============================================================================
// CLI Definition
// ============================================================================

/// ccapi CLI - resilient backend requests.
#[derive(Parser)]
#[command(name = "ccapi")]
#[command(about = "Resilient API request CLI")]
#[command(long_about = r#"
ccapi issues requests against the configured backend with automatic
retries, a single token refresh on 401 and idempotency keys on
mutating verbs.

Origin resolution:
  • server context: CCAPI_API_URL_INTERNAL, then CCAPI_API_ORIGIN
  • browser context: CCAPI_API_ORIGIN, then the local backend for
    development pages, then the page origin

Examples:
  ccapi get dashboard             # Authenticated GET
  ccapi get health --no-auth      # Public GET
  ccapi post items --data '{}'    # Mutating request
  ccapi status                    # Origin and token state
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Token store backend, overriding the configured one.
    #[arg(long, global = true)]
    pub store: Option<StoreArg>,

    /// Execution context used to resolve the backend origin.
    #[arg(long, default_value = "server", global = true)]
    pub context: ContextArg,

    /// Page origin for the browser context.
    #[arg(long, default_value = "http://localhost:3000", global = true)]
    pub page_origin: String,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// GET a path.
    Get(request::RequestArgs),

    /// DELETE a path.
    Delete(request::RequestArgs),

    /// POST to a path.
    Post(request::BodyRequestArgs),

    /// PUT to a path.
    Put(request::BodyRequestArgs),

    /// PATCH a path.
    Patch(request::BodyRequestArgs),

    /// Store an access/refresh token pair.
    Login(auth::LoginArgs),

    /// Remove stored tokens.
    Logout,

    /// Show the stored token (masked).
    Token,

    /// Show origin, context and token state.
    Status,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Token store backends selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    /// JSON file in the config directory.
    File,
    /// System keychain.
    Keychain,
    /// Process memory (nothing persists).
    Memory,
}

/// Execution contexts selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ContextArg {
    /// Server-side, internal network reachable.
    #[default]
    Server,
    /// Browser-side, served from `--page-origin`.
    Browser,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Not signed in, or the session could not be refreshed.
    Unauthenticated = 2,
    /// The backend answered with an error status.
    HttpError = 3,
    /// No response from the backend.
    Network = 4,
}

impl ExitCode {
    /// Maps an error to its exit code.
    pub fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<ApiError>() {
            Some(e) if e.is_auth_error() => Self::Unauthenticated,
            Some(ApiError::Http { .. } | ApiError::DuplicateClaim { .. }) => Self::HttpError,
            Some(ApiError::Network(_)) => Self::Network,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("ccapi=debug,info")
    } else {
        EnvFilter::new("ccapi=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Get(args) => request::run_simple(HttpMethod::Get, args, &cli).await,
        Commands::Delete(args) => request::run_simple(HttpMethod::Delete, args, &cli).await,
        Commands::Post(args) => request::run_body(HttpMethod::Post, args, &cli).await,
        Commands::Put(args) => request::run_body(HttpMethod::Put, args, &cli).await,
        Commands::Patch(args) => request::run_body(HttpMethod::Patch, args, &cli).await,
        Commands::Login(args) => auth::login(args, &cli).await,
        Commands::Logout => auth::logout(&cli).await,
        Commands::Token => auth::token(&cli).await,
        Commands::Status => auth::status(&cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            output::print_error(&e, &cli);
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
