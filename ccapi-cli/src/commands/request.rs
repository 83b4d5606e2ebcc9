//! Request commands - issue one request against the backend.

use std::path::Path;

use anyhow::{Context, Result, bail};
use ccapi_core::HttpMethod;
use ccapi_fetch::{ApiResponse, FormField, RequestBody, RequestOptions};
use clap::Args;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Session;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments shared by every request command.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Backend path below `/api/` (e.g. `dashboard` or `/items/1`).
    pub path: String,

    /// Send without credentials.
    #[arg(long)]
    pub no_auth: bool,

    /// Retries after the first attempt (defaults to the configured value).
    #[arg(long)]
    pub retry: Option<u32>,

    /// Backoff base in milliseconds (defaults to the configured value).
    #[arg(long)]
    pub backoff_ms: Option<u64>,

    /// Print the raw response body instead of parsed JSON.
    #[arg(long)]
    pub raw: bool,

    /// Extra header, `Name: value`. May be repeated.
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Explicit idempotency key for mutating requests.
    #[arg(long)]
    pub idempotency_key: Option<String>,
}

/// Arguments for requests that carry a body.
#[derive(Args, Debug)]
pub struct BodyRequestArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// JSON body, or `@path` to read it from a file.
    #[arg(long, short = 'd', conflicts_with = "form")]
    pub data: Option<String>,

    /// Multipart field, `name=value` or `name=@path`. May be repeated.
    #[arg(long = "form", short = 'F')]
    pub form: Vec<String>,
}

/// Runs a request without a body.
pub async fn run_simple(method: HttpMethod, args: &RequestArgs, cli: &Cli) -> Result<()> {
    run(method, args, None, cli).await
}

/// Runs a request with an optional body.
pub async fn run_body(method: HttpMethod, args: &BodyRequestArgs, cli: &Cli) -> Result<()> {
    let body = if !args.form.is_empty() {
        Some(parse_form(&args.form).await?)
    } else if let Some(data) = &args.data {
        Some(parse_data(data).await?)
    } else {
        None
    };
    run(method, &args.request, body, cli).await
}

async fn run(
    method: HttpMethod,
    args: &RequestArgs,
    body: Option<RequestBody>,
    cli: &Cli,
) -> Result<()> {
    check_path(&args.path)?;
    let session = Session::open(cli).await?;
    let cancel = CancellationToken::new();
    let options = build_options(&session, method, args, body, cancel.clone())?;

    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel));
    let result = session.client.request(&args.path, options).await;
    watcher.abort();

    print_response(result?, cli)
}

/// Merges configured defaults with the command-line overrides.
fn build_options(
    session: &Session,
    method: HttpMethod,
    args: &RequestArgs,
    body: Option<RequestBody>,
    cancel: CancellationToken,
) -> Result<RequestOptions> {
    let mut options = session
        .settings
        .request_defaults()
        .method(method)
        .auth(!args.no_auth)
        .cancel(cancel);

    if let Some(retry) = args.retry {
        options = options.retry(retry);
    }
    if let Some(backoff) = args.backoff_ms {
        options = options.backoff_ms(backoff);
    }
    if let Some(body) = body {
        options = options.body(body);
    }
    if let Some(key) = &args.idempotency_key {
        options = options.idempotency_key(key.clone());
    }
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    if args.raw {
        options = options.text();
    }
    Ok(options)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Interrupted, cancelling request");
        cancel.cancel();
    }
}

fn print_response(response: Option<ApiResponse>, cli: &Cli) -> Result<()> {
    let Some(response) = response else {
        // Authenticated GET without a stored token.
        match cli.format {
            OutputFormat::Json => println!("null"),
            OutputFormat::Text if !cli.quiet => eprintln!("Not signed in"),
            OutputFormat::Text => {}
        }
        return Ok(());
    };

    match (cli.format, response) {
        (_, ApiResponse::Text(text)) => println!("{text}"),
        (OutputFormat::Json, ApiResponse::Json(value)) => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&value)?);
        }
        (OutputFormat::Text, ApiResponse::Json(value)) => {
            println!("{}", TextFormatter::new(!cli.no_color).format_value(&value));
        }
    }
    Ok(())
}

// ============================================================================
// Argument Parsing
// ============================================================================

/// The client adds `/api/` itself; a second copy would hit `/api/api/...`.
fn check_path(path: &str) -> Result<()> {
    let trimmed = path.trim_start_matches('/');
    if trimmed == "api" || trimmed.starts_with("api/") {
        bail!("Path '{path}' already includes the api/ prefix; pass it without the prefix");
    }
    Ok(())
}

/// Splits `Name: value` into its parts.
fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header '{raw}', expected 'Name: value'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{raw}', name is empty");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

async fn parse_data(data: &str) -> Result<RequestBody> {
    let text = match data.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read body from {path}"))?,
        None => data.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("Body is not valid JSON")?;
    Ok(RequestBody::Json(value))
}

async fn parse_form(fields: &[String]) -> Result<RequestBody> {
    let mut parts = Vec::with_capacity(fields.len());
    for raw in fields {
        let Some((name, value)) = raw.split_once('=') else {
            bail!("Invalid form field '{raw}', expected 'name=value'");
        };
        let part = match value.strip_prefix('@') {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read form file {path}"))?;
                let file_name = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                debug!(field = name, size = bytes.len(), "Attaching file");
                FormField::file(name, bytes, file_name)
            }
            None => FormField::text(name, value),
        };
        parts.push(part);
    }
    Ok(RequestBody::Form(parts))
}
