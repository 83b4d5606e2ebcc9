//! HTTP transport.
//!
//! The executor talks to the network through [`Transport`] so the retry and
//! refresh logic can be exercised without sockets. [`HttpClient`] is the
//! production implementation on top of reqwest:
//! - Cookie jar shared by every request (credentials included)
//! - Caller cancellation raced against the network call
//! - Request/response tracing

use std::time::Duration;

use async_trait::async_trait;
use ccapi_core::HttpMethod;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::TransportError;
use crate::request::{FormField, FormValue, RequestBody};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for ccapi.
pub const USER_AGENT: &str = concat!("ccapi/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Wire Types
// ============================================================================

/// One network round-trip, fully assembled.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Final headers.
    pub headers: HeaderMap,
    /// Payload.
    pub body: Option<RequestBody>,
    /// Cancellation signal.
    pub cancel: Option<CancellationToken>,
}

/// Response status and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body text; `None` if it could not be read.
    pub body: Option<String>,
}

impl HttpResponse {
    /// Creates a response with a body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body, or `HTTP <status>` if it could not be read.
    pub fn error_text(&self) -> String {
        self.body
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Issues one HTTP request.
///
/// An `Err` means no response was received at all; any status code, 5xx
/// included, is an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// HTTP Client
// ============================================================================

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a client with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::with_options(timeout, USER_AGENT)
    }

    /// Creates a client with a custom timeout and user agent.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()?;

        Ok(Self { inner: client })
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            cancel,
        } = request;

        let mut builder = self.inner.request(to_reqwest_method(method), &url).headers(headers);
        builder = match body {
            Some(RequestBody::Json(value)) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::Build(format!("Body serialization failed: {e}")))?;
                builder.body(bytes)
            }
            Some(RequestBody::Form(fields)) => builder.multipart(build_form(fields)?),
            None => builder,
        };

        let exchange = async move {
            let response = builder.send().await.map_err(TransportError::from_reqwest)?;
            let status = response.status().as_u16();
            debug!(status, "Response received");

            let body = match response.text().await {
                Ok(text) => Some(text),
                Err(e) => {
                    debug!(error = %e, "Failed to read response body");
                    None
                }
            };
            Ok::<_, TransportError>(HttpResponse { status, body })
        };

        // Cancellation covers the body read as well as the headers.
        match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!("Request cancelled by caller");
                    Err(TransportError::Cancelled)
                }
                result = exchange => result,
            },
            None => exchange.await,
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Rebuilds a multipart form; reqwest forms are single-use, retries need a
/// fresh one each attempt.
fn build_form(fields: Vec<FormField>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match field.value {
            FormValue::Text(text) => form.text(field.name, text),
            FormValue::File {
                bytes,
                file_name,
                mime,
            } => {
                let mut part = Part::bytes(bytes);
                if let Some(file_name) = file_name {
                    part = part.file_name(file_name);
                }
                if let Some(mime) = mime {
                    part = part
                        .mime_str(&mime)
                        .map_err(|e| TransportError::Build(format!("Invalid MIME type '{mime}': {e}")))?;
                }
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}

// ============================================================================
// Tests
// ============================================================================
