//! Client settings.
//!
//! [`Settings`] is persisted as JSON next to the token file. The environment
//! overlays it when a [`ClientConfig`] is built, so deployments can override
//! any file value without editing it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ccapi_core::{MemoryTokenStore, TokenStore};
use ccapi_fetch::context::DEFAULT_BUILD_ID;
use ccapi_fetch::host::http::DEFAULT_TIMEOUT_SECS;
use ccapi_fetch::retry::{DEFAULT_BACKOFF_BASE, DEFAULT_RETRIES};
use ccapi_fetch::{ClientConfig, ExecutionContext, OriginConfig, RequestOptions};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::file_store::FileTokenStore;
use crate::keychain::KeychainTokenStore;
use crate::persistence::{default_settings_path, default_tokens_path, load_json_or_default, save_json};

// ============================================================================
// Token Backend
// ============================================================================

/// Where tokens are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenBackend {
    /// JSON file in the config directory.
    #[default]
    File,
    /// System keychain.
    Keychain,
    /// Process memory only.
    Memory,
}

impl TokenBackend {
    /// Returns all backends.
    pub fn all() -> &'static [TokenBackend] {
        &[Self::File, Self::Keychain, Self::Memory]
    }

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Keychain => "keychain",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for TokenBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenBackend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::Config(format!("Unknown token backend: {s}")))
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Persisted client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Public API origin.
    pub api_origin: Option<String>,
    /// Internal-network API origin (server context only).
    pub internal_origin: Option<String>,
    /// Build identifier.
    pub build_id: String,
    /// Request lifecycle logging.
    pub log_enabled: bool,
    /// Development checks.
    pub dev_mode: bool,
    /// Default retry budget.
    pub retry: u32,
    /// Default backoff base in milliseconds.
    pub backoff_ms: u64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Token persistence backend.
    pub token_backend: TokenBackend,
    /// Token file location for the file backend.
    pub tokens_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_origin: None,
            internal_origin: None,
            build_id: DEFAULT_BUILD_ID.to_string(),
            log_enabled: true,
            dev_mode: true,
            retry: DEFAULT_RETRIES,
            backoff_ms: u64::try_from(DEFAULT_BACKOFF_BASE.as_millis()).unwrap_or(300),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_backend: TokenBackend::File,
            tokens_path: None,
        }
    }
}

impl Settings {
    /// Keys accepted by [`set_value`](Self::set_value).
    pub const KEYS: &'static [&'static str] = &[
        "api_origin",
        "internal_origin",
        "build_id",
        "log_enabled",
        "dev_mode",
        "retry",
        "backoff_ms",
        "timeout_secs",
        "token_backend",
        "tokens_path",
    ];

    /// Sets one value from its string form. An empty value clears optional keys.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        match key {
            "api_origin" => self.api_origin = optional(value),
            "internal_origin" => self.internal_origin = optional(value),
            "build_id" => self.build_id = value.to_string(),
            "log_enabled" => self.log_enabled = parse_bool(key, value)?,
            "dev_mode" => self.dev_mode = parse_bool(key, value)?,
            "retry" => self.retry = parse_number(key, value)?,
            "backoff_ms" => self.backoff_ms = parse_number(key, value)?,
            "timeout_secs" => self.timeout_secs = parse_number(key, value)?,
            "token_backend" => self.token_backend = value.parse()?,
            "tokens_path" => self.tokens_path = optional(value).map(PathBuf::from),
            _ => return Err(StoreError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Returns the token file location.
    pub fn tokens_path(&self) -> PathBuf {
        self.tokens_path.clone().unwrap_or_else(default_tokens_path)
    }

    /// Builds a client config for `context`, overlaid by `lookup`.
    pub fn client_config<F>(&self, context: ExecutionContext, lookup: F) -> ClientConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_origins = OriginConfig::from_lookup(&lookup);
        let origins = OriginConfig {
            public_origin: env_origins.public_origin.or_else(|| self.api_origin.clone()),
            internal_origin: env_origins
                .internal_origin
                .or_else(|| self.internal_origin.clone()),
        };

        let mut config = ClientConfig::new(context)
            .with_origins(origins)
            .with_build_id(self.build_id.clone())
            .with_logging(self.log_enabled)
            .with_dev_mode(self.dev_mode)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        config.apply_lookup(&lookup);
        config
    }

    /// Builds a client config for `context`, overlaid by the process environment.
    pub fn client_config_from_env(&self, context: ExecutionContext) -> ClientConfig {
        self.client_config(context, |key| std::env::var(key).ok())
    }

    /// Returns request options carrying the default retry budget and backoff.
    pub fn request_defaults(&self) -> RequestOptions {
        RequestOptions::new()
            .retry(self.retry)
            .backoff_ms(self.backoff_ms)
    }

    /// Opens the configured token store.
    pub fn open_token_store(&self) -> Arc<dyn TokenStore> {
        open_token_store(self.token_backend, self.tokens_path())
    }
}

/// Opens a token store for `backend`; `path` is used by the file backend.
pub fn open_token_store(backend: TokenBackend, path: PathBuf) -> Arc<dyn TokenStore> {
    debug!(backend = %backend, "Opening token store");
    match backend {
        TokenBackend::File => Arc::new(FileTokenStore::new(path)),
        TokenBackend::Keychain => Arc::new(KeychainTokenStore::new()),
        TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, StoreError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(StoreError::Config(format!("{key} expects a boolean, got '{value}'"))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Config(format!("{key} expects a number, got '{value}'")))
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings loaded from disk.
#[derive(Debug)]
pub struct SettingsStore {
    settings: RwLock<Settings>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store with default settings.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: RwLock::new(Settings::default()),
            path,
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path; a missing or invalid file yields defaults.
    pub async fn load(path: PathBuf) -> Self {
        let settings: Settings = load_json_or_default(&path).await;
        debug!(path = %path.display(), "Settings loaded");
        Self {
            settings: RwLock::new(settings),
            path,
        }
    }

    /// Returns the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings in memory.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Settings) -> R,
    {
        let mut settings = self.settings.write().await;
        f(&mut settings)
    }

    /// Restores defaults in memory.
    pub async fn reset(&self) {
        *self.settings.write().await = Settings::default();
    }

    /// Saves settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
