//! Request and response types for the executor.
//!
//! [`RequestOptions`] is what callers build; the executor freezes it together
//! with the normalized path into a [`RequestSpec`] for the duration of one
//! logical request.

use std::sync::Arc;
use std::time::Duration;

use ccapi_core::HttpMethod;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::idempotency::IDEMPOTENCY_HEADER;
use crate::retry::{DEFAULT_BACKOFF_BASE, DEFAULT_RETRIES, RetryPolicy};

/// Fixed prefix between the origin and every request path.
pub const API_PREFIX: &str = "/api/";

/// Post-processing applied to a parsed JSON payload.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

// ============================================================================
// Bodies
// ============================================================================

/// Value of one multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain text field.
    Text(String),
    /// Binary part, optionally named and typed.
    File {
        /// Raw bytes.
        bytes: Vec<u8>,
        /// File name sent with the part.
        file_name: Option<String>,
        /// MIME type of the part.
        mime: Option<String>,
    },
}

/// One multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

impl FormField {
    /// Creates a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// Creates a binary field.
    pub fn file(name: impl Into<String>, bytes: Vec<u8>, file_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                bytes,
                file_name,
                mime: None,
            },
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document, serialized as-is.
    Json(Value),
    /// Multipart form; the HTTP stack chooses the `Content-Type` boundary.
    Form(Vec<FormField>),
}

impl RequestBody {
    /// Serializes any value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ApiError::InvalidRequest(format!("Unserializable body: {e}")))
    }

    /// Returns true for multipart bodies.
    pub fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }

    /// Returns true if there is nothing to send (`null` JSON).
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }
}

// ============================================================================
// Responses
// ============================================================================

/// How a 2xx body is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Parse as JSON; unparseable bodies become `null`.
    #[default]
    Json,
    /// Return the raw text.
    Text,
}

/// Successful response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed (and possibly transformed) JSON.
    Json(Value),
    /// Raw text.
    Text(String),
}

impl ApiResponse {
    /// Converts the payload to JSON; text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Returns the raw text, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Deserializes the payload into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.into_json())?)
    }
}

// ============================================================================
// Request Options
// ============================================================================

/// Per-call options.
///
/// Defaults: GET, authenticated, 2 retries, 300 ms backoff base, JSON
/// response mode.
#[derive(Clone)]
pub struct RequestOptions {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Optional payload.
    pub body: Option<RequestBody>,
    /// Attach the stored bearer token (and require one).
    pub auth: bool,
    /// Retries allowed after the first attempt.
    pub retry: u32,
    /// Delay before the first retry; doubles for each later one.
    pub backoff_base: Duration,
    /// Extra headers; later entries win over earlier ones with the same name.
    pub headers: Vec<(String, String)>,
    /// Cancellation signal observed by the network call.
    pub cancel: Option<CancellationToken>,
    /// How to hand back a 2xx body.
    pub response_mode: ResponseMode,
    /// Post-processing of parsed JSON.
    pub transform: Option<Transform>,
}

impl RequestOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP verb.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the payload.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `value` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.body(RequestBody::json(value)?))
    }

    /// Sets whether to authenticate.
    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    /// Sends the request without a bearer token.
    pub fn no_auth(self) -> Self {
        self.auth(false)
    }

    /// Sets the retry budget.
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the backoff base.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the backoff base in milliseconds.
    pub fn backoff_ms(self, millis: u64) -> Self {
        self.backoff_base(Duration::from_millis(millis))
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Supplies the idempotency key instead of generating one.
    pub fn idempotency_key(self, key: impl Into<String>) -> Self {
        self.header(IDEMPOTENCY_HEADER, key)
    }

    /// Sets the cancellation signal.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the body as raw text.
    pub fn text(mut self) -> Self {
        self.response_mode = ResponseMode::Text;
        self
    }

    /// Applies `f` to the parsed JSON payload.
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Returns true if a header with this name (any case) was supplied.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Returns the retry policy these options describe.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry, self.backoff_base)
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            body: None,
            auth: true,
            retry: DEFAULT_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            headers: Vec::new(),
            cancel: None,
            response_mode: ResponseMode::Json,
            transform: None,
        }
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("has_body", &self.body.is_some())
            .field("auth", &self.auth)
            .field("retry", &self.retry)
            .field("backoff_base", &self.backoff_base)
            .field("headers", &self.headers.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("response_mode", &self.response_mode)
            .field("has_transform", &self.transform.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Request Spec
// ============================================================================

/// A logical request, frozen for the lifetime of one executor run.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    path: String,
    options: RequestOptions,
}

impl RequestSpec {
    /// Freezes a path and options; one leading slash is stripped from `path`.
    pub fn new(path: &str, mut options: RequestOptions) -> Self {
        if options.body.as_ref().is_some_and(RequestBody::is_empty) {
            options.body = None;
        }
        Self {
            path: normalize_path(path).to_string(),
            options,
        }
    }

    /// Returns the normalized path (no leading slash).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the options.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Returns the HTTP verb.
    pub fn method(&self) -> HttpMethod {
        self.options.method
    }

    /// Returns the full URL for `origin`.
    pub fn url(&self, origin: &str) -> String {
        build_url(origin, &self.path)
    }
}

/// Strips one leading slash.
pub fn normalize_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Composes `origin + "/api/" + path`.
pub fn build_url(origin: &str, path: &str) -> String {
    format!("{origin}{API_PREFIX}{}", normalize_path(path))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let options = RequestOptions::default();
        assert_eq!(options.method, HttpMethod::Get);
        assert!(options.auth);
        assert_eq!(options.retry, 2);
        assert_eq!(options.backoff_base, Duration::from_millis(300));
        assert_eq!(options.response_mode, ResponseMode::Json);
        assert!(options.transform.is_none());
    }

    #[test]
    fn test_path_normalization() {
        let spec = RequestSpec::new("/events/123/claim", RequestOptions::new());
        assert_eq!(spec.path(), "events/123/claim");
        assert_eq!(
            spec.url("http://backend:8000"),
            "http://backend:8000/api/events/123/claim"
        );

        // Only one slash is stripped.
        assert_eq!(normalize_path("//x"), "/x");
        assert_eq!(build_url("http://a", "auth/login"), "http://a/api/auth/login");
    }

    #[test]
    fn test_null_body_is_dropped() {
        let options = RequestOptions::new().body(RequestBody::Json(Value::Null));
        let spec = RequestSpec::new("x", options);
        assert!(spec.options().body.is_none());
    }

    #[test]
    fn test_has_header_is_case_insensitive() {
        let options = RequestOptions::new().header("x-idempotency-key", "k");
        assert!(options.has_header(IDEMPOTENCY_HEADER));
        assert!(!options.has_header("Authorization"));
    }

    #[test]
    fn test_response_decode() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Balance {
            gold: u32,
        }

        let decoded: Balance = ApiResponse::Json(json!({ "gold": 7 })).decode().unwrap();
        assert_eq!(decoded, Balance { gold: 7 });

        let text: String = ApiResponse::Text("ok".into()).decode().unwrap();
        assert_eq!(text, "ok");

        let err = ApiResponse::Json(json!("x")).decode::<Balance>().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_json_body() {
        let body = RequestBody::json(&json!({ "a": 1 })).unwrap();
        assert_eq!(body, RequestBody::Json(json!({ "a": 1 })));
        assert!(!body.is_form());
        assert!(RequestBody::Form(vec![FormField::text("a", "b")]).is_form());
    }
}
