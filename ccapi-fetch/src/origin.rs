//! Backend origin resolution.
//!
//! Every request targets a single origin (scheme + host + port, no trailing
//! slash). Which one depends on where the client runs:
//!
//! - **Server**: internal-network override, then the public origin, then
//!   [`DEFAULT_SERVER_ORIGIN`]
//! - **Browser**: the public origin, then the local backend when the page is
//!   served from a development port, then the page's own origin
//!
//! [`OriginResolver::resolve`] is pure. [`process_origin`] caches the first
//! resolution for the lifetime of the process.

use std::fmt;
use std::sync::OnceLock;

use tracing::warn;
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Origin used on the server when nothing is configured.
pub const DEFAULT_SERVER_ORIGIN: &str = "http://backend:8000";

/// Backend origin used by pages served from a development port.
pub const LOCAL_BACKEND_ORIGIN: &str = "http://localhost:8000";

/// Ports the development front-end is served from.
pub const DEV_PAGE_PORTS: &[u16] = &[3000, 3001];

/// Environment variable holding the public API origin.
pub const ENV_PUBLIC_ORIGIN: &str = "CCAPI_API_ORIGIN";

/// Environment variable holding the internal-network API origin.
pub const ENV_INTERNAL_ORIGIN: &str = "CCAPI_API_URL_INTERNAL";

// ============================================================================
// Execution Context
// ============================================================================

/// Where the client is running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    /// Server-side: can reach the backend over the internal network.
    #[default]
    Server,
    /// Browser-side: runs inside a page served from `page_origin`.
    Browser {
        /// Origin of the page hosting the client (e.g. `http://localhost:3000`).
        page_origin: String,
    },
}

impl ExecutionContext {
    /// Creates a browser context for a page origin.
    pub fn browser(page_origin: impl Into<String>) -> Self {
        Self::Browser {
            page_origin: page_origin.into(),
        }
    }

    /// Returns the short label used in logs (`server` / `browser`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Browser { .. } => "browser",
        }
    }

    /// Returns true for the server context.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server)
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Origin Config
// ============================================================================

/// Configured origin values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginConfig {
    /// Public API origin (reachable from browsers).
    pub public_origin: Option<String>,
    /// Internal-network override, only used on the server.
    pub internal_origin: Option<String>,
}

impl OriginConfig {
    /// Creates a config with only a public origin.
    pub fn public(origin: impl Into<String>) -> Self {
        Self {
            public_origin: Some(origin.into()),
            internal_origin: None,
        }
    }

    /// Sets the internal-network override.
    pub fn with_internal(mut self, origin: impl Into<String>) -> Self {
        self.internal_origin = Some(origin.into());
        self
    }

    /// Reads the origins through a lookup function (usually `std::env::var`).
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            public_origin: read(ENV_PUBLIC_ORIGIN),
            internal_origin: read(ENV_INTERNAL_ORIGIN),
        }
    }

    /// Reads the origins from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// How an origin was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginSource {
    /// Internal-network override (server only).
    Internal,
    /// Configured public origin.
    Public,
    /// Built-in server default.
    ServerDefault,
    /// Local backend for a page on a development port.
    LocalBackend,
    /// The page's own origin.
    PageOrigin,
}

impl OriginSource {
    /// Returns true if the origin came from configuration.
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Internal | Self::Public)
    }
}

/// Resolved origin plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrigin {
    /// Origin without a trailing slash.
    pub origin: String,
    /// Rule that produced it.
    pub source: OriginSource,
}

/// Pure origin resolver.
#[derive(Debug, Clone, Default)]
pub struct OriginResolver {
    context: ExecutionContext,
    config: OriginConfig,
}

impl OriginResolver {
    /// Creates a resolver for a context and config.
    pub fn new(context: ExecutionContext, config: OriginConfig) -> Self {
        Self { context, config }
    }

    /// Returns the execution context.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Returns the origin config.
    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    /// Resolves the origin, reporting which rule applied.
    pub fn resolve_with_source(&self) -> ResolvedOrigin {
        let public = self.config.public_origin.as_deref().filter(|o| is_absolute_http(o));

        let (origin, source) = match &self.context {
            ExecutionContext::Server => {
                let internal = self
                    .config
                    .internal_origin
                    .as_deref()
                    .filter(|o| is_absolute_http(o));
                match (internal, public) {
                    (Some(o), _) => (o.to_string(), OriginSource::Internal),
                    (None, Some(o)) => (o.to_string(), OriginSource::Public),
                    (None, None) => (DEFAULT_SERVER_ORIGIN.to_string(), OriginSource::ServerDefault),
                }
            }
            ExecutionContext::Browser { page_origin } => match public {
                Some(o) => (o.to_string(), OriginSource::Public),
                None if is_dev_page(page_origin) => {
                    (LOCAL_BACKEND_ORIGIN.to_string(), OriginSource::LocalBackend)
                }
                None => (page_origin.clone(), OriginSource::PageOrigin),
            },
        };

        ResolvedOrigin {
            origin: trim_trailing_slash(&origin),
            source,
        }
    }

    /// Resolves the origin and warns when an unconfigured fallback was used.
    pub fn resolve(&self) -> String {
        let resolved = self.resolve_with_source();
        if !resolved.source.is_configured() && self.config.public_origin.is_none() {
            warn!(
                context = %self.context,
                fallback = %resolved.origin,
                "{ENV_PUBLIC_ORIGIN} not set, using fallback origin"
            );
        }
        resolved.origin
    }
}

// ============================================================================
// Process-wide Origin
// ============================================================================

/// Origin resolved once for the whole process.
static PROCESS_ORIGIN: OnceLock<String> = OnceLock::new();

/// Returns the process-wide origin, resolving it with `resolver` on first use.
///
/// The first caller wins: later calls return the cached value whatever
/// resolver they pass. Clients that need a specific origin (tests, multiple
/// backends) should pass it to the client builder instead.
pub fn process_origin(resolver: &OriginResolver) -> &'static str {
    PROCESS_ORIGIN.get_or_init(|| resolver.resolve())
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns true for absolute `http://` or `https://` URLs.
fn is_absolute_http(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

/// Returns true if the page origin uses one of the development ports.
fn is_dev_page(page_origin: &str) -> bool {
    Url::parse(page_origin)
        .ok()
        .and_then(|url| url.port())
        .is_some_and(|port| DEV_PAGE_PORTS.contains(&port))
}

fn trim_trailing_slash(origin: &str) -> String {
    let origin = origin.trim();
    origin.strip_suffix('/').unwrap_or(origin).to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn server(config: OriginConfig) -> OriginResolver {
        OriginResolver::new(ExecutionContext::Server, config)
    }

    fn browser(page: &str, config: OriginConfig) -> OriginResolver {
        OriginResolver::new(ExecutionContext::browser(page), config)
    }

    #[test]
    fn test_server_prefers_internal_origin() {
        let config = OriginConfig::public("https://api.example.com")
            .with_internal("http://backend.internal:8000/");
        let resolved = server(config).resolve_with_source();

        assert_eq!(resolved.origin, "http://backend.internal:8000");
        assert_eq!(resolved.source, OriginSource::Internal);
    }

    #[test]
    fn test_server_falls_back_to_public_then_default() {
        let resolved = server(OriginConfig::public("https://api.example.com/")).resolve();
        assert_eq!(resolved, "https://api.example.com");

        let resolved = server(OriginConfig::default()).resolve_with_source();
        assert_eq!(resolved.origin, DEFAULT_SERVER_ORIGIN);
        assert_eq!(resolved.source, OriginSource::ServerDefault);
    }

    #[test]
    fn test_server_ignores_relative_internal_origin() {
        let config = OriginConfig {
            public_origin: None,
            internal_origin: Some("backend:8000".to_string()),
        };
        assert_eq!(server(config).resolve(), DEFAULT_SERVER_ORIGIN);
    }

    #[test]
    fn test_browser_uses_absolute_public_origin() {
        let config = OriginConfig::public("https://api.example.com")
            .with_internal("http://backend.internal:8000");
        let resolved = browser("http://localhost:3000", config).resolve_with_source();

        // The internal override is never used from a browser.
        assert_eq!(resolved.origin, "https://api.example.com");
        assert_eq!(resolved.source, OriginSource::Public);
    }

    #[test]
    fn test_browser_dev_port_uses_local_backend() {
        for page in ["http://localhost:3000", "http://127.0.0.1:3001/"] {
            let resolved = browser(page, OriginConfig::default()).resolve_with_source();
            assert_eq!(resolved.origin, LOCAL_BACKEND_ORIGIN);
            assert_eq!(resolved.source, OriginSource::LocalBackend);
        }
    }

    #[test]
    fn test_browser_relative_public_origin_falls_back() {
        let resolved =
            browser("https://play.example.com/", OriginConfig::public("/api")).resolve_with_source();

        assert_eq!(resolved.origin, "https://play.example.com");
        assert_eq!(resolved.source, OriginSource::PageOrigin);
    }

    #[test]
    fn test_from_lookup_treats_empty_as_unset() {
        let config = OriginConfig::from_lookup(|key| match key {
            ENV_PUBLIC_ORIGIN => Some("  ".to_string()),
            ENV_INTERNAL_ORIGIN => Some("http://backend.internal".to_string()),
            _ => None,
        });

        assert!(config.public_origin.is_none());
        assert_eq!(config.internal_origin.as_deref(), Some("http://backend.internal"));
    }

    #[test]
    fn test_process_origin_is_cached() {
        let first = process_origin(&server(OriginConfig::public("https://first.example.com")));
        let second = process_origin(&server(OriginConfig::public("https://second.example.com")));
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_absolute_http() {
        assert!(is_absolute_http("http://a"));
        assert!(is_absolute_http("HTTPS://api.example.com"));
        assert!(!is_absolute_http("ftp://example.com"));
        assert!(!is_absolute_http("/api"));
        assert!(!is_absolute_http("https://"));
    }
}
