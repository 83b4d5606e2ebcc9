//! Config command - manage configuration.

use anyhow::Result;
use ccapi_store::{
    Settings, SettingsStore, default_config_dir, default_settings_path, remove_file,
};
use clap::{Args, Subcommand};
use tracing::info;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set one value. An empty value clears optional keys.
    Set {
        /// Setting name (e.g. `api_origin`, `retry`, `token_backend`).
        key: String,
        /// New value.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli).await,
        ConfigAction::Set { key, value } => set_value(key, value, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await;
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("ccapi Configuration");
            println!("{}", "─".repeat(40));
            println!();
            print_settings(&settings);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn print_settings(settings: &Settings) {
    let unset = "(unset)".to_string();
    println!(
        "API origin:       {}",
        settings.api_origin.as_ref().unwrap_or(&unset)
    );
    println!(
        "Internal origin:  {}",
        settings.internal_origin.as_ref().unwrap_or(&unset)
    );
    println!("Build id:         {}", settings.build_id);
    println!("Logging:          {}", settings.log_enabled);
    println!("Dev mode:         {}", settings.dev_mode);
    println!("Retry:            {}", settings.retry);
    println!("Backoff (ms):     {}", settings.backoff_ms);
    println!("Timeout (s):      {}", settings.timeout_secs);
    println!("Token backend:    {}", settings.token_backend);
    println!("Tokens file:      {}", settings.tokens_path().display());
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let tokens_path = SettingsStore::load_default().await.get().await.tokens_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Tokens file:   {}", tokens_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "tokens_file": tokens_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, _cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await;
    store.update(|settings| settings.set_value(key, value)).await?;
    store.save().await?;

    info!(key, "Setting updated");
    println!("{key} = {value}");

    Ok(())
}

async fn reset_config(_cli: &Cli) -> Result<()> {
    let path = default_settings_path();

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        remove_file(&path).await?;
        info!(path = %path.display(), "Settings reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
