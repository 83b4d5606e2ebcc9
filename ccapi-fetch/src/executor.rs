//! Request executor.
//!
//! One logical request runs as a loop of attempts. Each attempt ends in one
//! of four steps:
//!
//! - **Done**: 2xx, payload parsed and transformed
//! - **Retry**: network failure or retryable status, budget left; sleep
//!   `backoff_base * 2^attempt` and go again
//! - **Refreshed**: 401 answered by a successful token refresh; go again
//!   with the new token (at most once per logical request)
//! - **Fail**: anything else, classified into an [`ApiError`]
//!
//! The attempt index grows by exactly one per re-attempt, refreshed ones
//! included. Only the retry branch is gated by the budget.

use std::sync::{Arc, LazyLock};

use ccapi_core::TokenStore;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, TransportError};
use crate::guard;
use crate::headers::{assemble_headers, header_names};
use crate::host::{HttpRequest, HttpResponse, Transport};
use crate::idempotency::{IDEMPOTENCY_HEADER, IdempotencyKeyGenerator};
use crate::refresh::RefreshCoordinator;
use crate::request::{ApiResponse, RequestOptions, RequestSpec, ResponseMode};
use crate::retry::RetryPolicy;

/// Backend phrasings of "daily reward already claimed".
static DUPLICATE_CLAIM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)하루에 1번|already\s*claimed").expect("Invalid regex"));

// ============================================================================
// Steps
// ============================================================================

/// Why an attempt is being retried.
#[derive(Debug)]
enum RetryReason {
    Network(TransportError),
    Status(u16),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Status(status) => write!(f, "status {status}"),
        }
    }
}

/// Result of one attempt.
#[derive(Debug)]
enum Step {
    Done(ApiResponse),
    Retry(RetryReason),
    Refreshed,
    Fail(ApiError),
}

// ============================================================================
// Executor
// ============================================================================

/// Runs logical requests against one origin.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    refresher: RefreshCoordinator,
    keys: Arc<IdempotencyKeyGenerator>,
    origin: String,
    log_enabled: bool,
    dev_mode: bool,
}

impl RequestExecutor {
    /// Creates an executor with the default key generator, logging on and
    /// dev checks off.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        origin: impl Into<String>,
    ) -> Self {
        let origin = origin.into();
        Self {
            refresher: RefreshCoordinator::new(transport.clone(), store.clone(), origin.clone()),
            transport,
            store,
            keys: Arc::new(IdempotencyKeyGenerator::new()),
            origin,
            log_enabled: true,
            dev_mode: false,
        }
    }

    /// Sets the idempotency key generator.
    pub fn with_key_generator(mut self, keys: Arc<IdempotencyKeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    /// Enables or disables request lifecycle logs.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// Enables or disables the dev path guard.
    pub fn with_dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    /// Returns the origin requests are sent to.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the token store.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Runs one logical request.
    ///
    /// Returns `Ok(None)` only for an authenticated GET with no stored token;
    /// no network call is made in that case.
    pub async fn execute(&self, spec: RequestSpec) -> Result<Option<ApiResponse>, ApiError> {
        let options = spec.options();
        let policy = options.retry_policy();
        let url = spec.url(&self.origin);
        let idempotency_key = (spec.method().is_mutating() && !options.has_header(IDEMPOTENCY_HEADER))
            .then(|| self.keys.new_key());

        let mut attempt: u32 = 0;
        let mut refresh_attempted = false;

        loop {
            let token = self.store.access_token().await;
            if options.auth && token.is_none() {
                return self.missing_token(&spec, &url);
            }

            let headers = assemble_headers(&spec, token.as_deref(), idempotency_key.as_deref())?;

            if attempt == 0 {
                if self.log_enabled {
                    debug!(
                        method = %spec.method(),
                        url = %url,
                        auth = options.auth,
                        retry = options.retry,
                        headers = ?header_names(&headers),
                        "Request"
                    );
                }
                if self.dev_mode {
                    guard::warn_on_violation(spec.path(), &url);
                }
            }

            let request = HttpRequest {
                method: spec.method(),
                url: url.clone(),
                headers,
                body: options.body.clone(),
                cancel: options.cancel.clone(),
            };
            let result = self.transport.send(request).await;

            match self
                .classify(result, options, &policy, attempt, &mut refresh_attempted, &url)
                .await
            {
                Step::Done(response) => return Ok(Some(response)),
                Step::Retry(reason) => {
                    let delay = policy.delay_for_attempt(attempt);
                    if self.log_enabled {
                        warn!(
                            url = %url,
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            reason = %reason,
                            "Retrying request"
                        );
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Step::Refreshed => {
                    debug!(url = %url, attempt, "Retrying with refreshed token");
                    attempt += 1;
                }
                Step::Fail(e) => return Err(e),
            }
        }
    }

    /// Credential gate: GET resolves to absent data, everything else fails.
    fn missing_token(&self, spec: &RequestSpec, url: &str) -> Result<Option<ApiResponse>, ApiError> {
        if spec.method().is_mutating() {
            if self.log_enabled {
                warn!(method = %spec.method(), url, "No access token, refusing mutating request");
            }
            Err(ApiError::Unauthenticated { status: 401 })
        } else {
            if self.log_enabled {
                info!(url, "No access token, skipping GET");
            }
            Ok(None)
        }
    }

    async fn classify(
        &self,
        result: Result<HttpResponse, TransportError>,
        options: &RequestOptions,
        policy: &RetryPolicy,
        attempt: u32,
        refresh_attempted: &mut bool,
        url: &str,
    ) -> Step {
        let response = match result {
            Ok(response) => response,
            Err(TransportError::Build(reason)) => {
                if self.log_enabled {
                    error!(url, reason = %reason, "Request could not be built");
                }
                return Step::Fail(ApiError::InvalidRequest(reason));
            }
            Err(e) if policy.can_retry(attempt) => return Step::Retry(RetryReason::Network(e)),
            Err(e) => {
                if self.log_enabled {
                    error!(url, error = %e, "Request failed");
                }
                return Step::Fail(ApiError::Network(e));
            }
        };

        if response.status == 401 && options.auth && !*refresh_attempted {
            *refresh_attempted = true;
            if self.refresher.refresh_once(options.cancel.as_ref()).await {
                return Step::Refreshed;
            }
            self.store.clear().await;
            if self.log_enabled {
                warn!(url, "Token refresh failed, cleared stored tokens");
            }
            return Step::Fail(ApiError::RefreshFailed {
                status: response.status,
                body: response.error_text(),
            });
        }

        if !response.is_success() {
            if RetryPolicy::is_retryable_status(response.status) && policy.can_retry(attempt) {
                return Step::Retry(RetryReason::Status(response.status));
            }
            return Step::Fail(self.format_error(&response, url).await);
        }

        match parse_success(response, options) {
            Ok(payload) => Step::Done(payload),
            Err(e) => Step::Fail(e),
        }
    }

    /// Classifies a terminal non-2xx response.
    async fn format_error(&self, response: &HttpResponse, url: &str) -> ApiError {
        let status = response.status;
        let body = response.error_text();

        if status == 403 && !self.store.has_access_token().await {
            if self.log_enabled {
                warn!(url, "Forbidden without an access token");
            }
            return ApiError::Unauthenticated { status };
        }

        if status == 400 && DUPLICATE_CLAIM_RE.is_match(&body) {
            if self.log_enabled {
                warn!(url, "Reward already claimed");
            }
            return ApiError::duplicate_claim();
        }

        if self.log_enabled {
            error!(url, status, body = %body, "Request failed");
        }
        ApiError::Http { status, body }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("origin", &self.origin)
            .field("log_enabled", &self.log_enabled)
            .field("dev_mode", &self.dev_mode)
            .finish_non_exhaustive()
    }
}

/// Turns a 2xx body into the payload the caller asked for.
fn parse_success(response: HttpResponse, options: &RequestOptions) -> Result<ApiResponse, ApiError> {
    match options.response_mode {
        ResponseMode::Text => response
            .body
            .map(ApiResponse::Text)
            .ok_or_else(|| ApiError::InvalidResponse(format!("Unreadable body (HTTP {})", response.status))),
        ResponseMode::Json => {
            let value = response
                .body
                .as_deref()
                .and_then(|body| serde_json::from_str::<Value>(body).ok())
                .unwrap_or(Value::Null);
            let value = match &options.transform {
                Some(transform) => transform(value),
                None => value,
            };
            Ok(ApiResponse::Json(value))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
