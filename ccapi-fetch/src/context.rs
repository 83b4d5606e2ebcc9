//! Client configuration.
//!
//! [`ClientConfig`] bundles everything the facade needs besides its
//! collaborators: where it runs, which origins are configured, and the
//! diagnostic toggles. Values can be read from the environment through an
//! injectable lookup so tests never touch the process environment.

use std::time::Duration;

use crate::host::http::{DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::origin::{ExecutionContext, OriginConfig};

/// Environment variable holding the build identifier.
pub const ENV_BUILD_ID: &str = "CCAPI_BUILD_ID";

/// Environment variable toggling request logging (`0` disables).
pub const ENV_LOG: &str = "CCAPI_LOG";

/// Environment variable naming the deployment (`production` disables dev mode).
pub const ENV_MODE: &str = "CCAPI_ENV";

/// Build identifier used when none is configured.
pub const DEFAULT_BUILD_ID: &str = "dev";

// ============================================================================
// Client Config
// ============================================================================

/// Settings for an [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Where the client runs.
    pub context: ExecutionContext,
    /// Configured origins.
    pub origins: OriginConfig,
    /// Build identifier reported in the init log line.
    pub build_id: String,
    /// Emit request lifecycle logs.
    pub log_enabled: bool,
    /// Enable development-only checks (path guard).
    pub dev_mode: bool,
    /// Per-request network timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            context: ExecutionContext::Server,
            origins: OriginConfig::default(),
            build_id: DEFAULT_BUILD_ID.to_string(),
            log_enabled: true,
            dev_mode: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a default config for a context.
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            ..Default::default()
        }
    }

    /// Reads the config for `context` through a lookup function.
    pub fn from_lookup<F>(context: ExecutionContext, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(context);
        config.origins = OriginConfig::from_lookup(&lookup);
        config.apply_lookup(&lookup);
        config
    }

    /// Reads the config for `context` from the process environment.
    pub fn from_env(context: ExecutionContext) -> Self {
        Self::from_lookup(context, |key| std::env::var(key).ok())
    }

    /// Overlays build id, log toggle and dev mode from a lookup function.
    ///
    /// Unset variables leave the current values alone.
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(build_id) = lookup(ENV_BUILD_ID).filter(|v| !v.trim().is_empty()) {
            self.build_id = build_id.trim().to_string();
        }
        if let Some(log) = lookup(ENV_LOG) {
            self.log_enabled = log.trim() != "0";
        }
        if let Some(mode) = lookup(ENV_MODE) {
            self.dev_mode = !mode.trim().eq_ignore_ascii_case("production");
        }
    }

    /// Sets the origins.
    pub fn with_origins(mut self, origins: OriginConfig) -> Self {
        self.origins = origins;
        self
    }

    /// Sets the build identifier.
    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = build_id.into();
        self
    }

    /// Enables or disables request logging.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// Enables or disables development checks.
    pub fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
