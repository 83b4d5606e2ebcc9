//! Header assembly for one attempt.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::ApiError;
use crate::idempotency::IDEMPOTENCY_HEADER;
use crate::request::RequestSpec;

/// MIME type used for `Accept` and the default `Content-Type`.
pub const JSON_MIME: &str = "application/json";

/// Lowercase form of [`IDEMPOTENCY_HEADER`].
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("x-idempotency-key");

/// Builds the final header set for a request.
///
/// Order of precedence, lowest first:
/// 1. `Accept: application/json`
/// 2. caller headers (later duplicates win)
/// 3. `Authorization: Bearer <token>` when `auth` is on and a token exists
/// 4. `Content-Type: application/json` for non-form bodies, unless supplied
/// 5. `idempotency_key` for mutating verbs, unless supplied
pub fn assemble_headers(
    spec: &RequestSpec,
    token: Option<&str>,
    idempotency_key: Option<&str>,
) -> Result<HeaderMap, ApiError> {
    let options = spec.options();
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));

    for (name, value) in &options.headers {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }

    if options.auth {
        if let Some(token) = token {
            let mut value = header_value("Authorization", &format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
    }

    if options.body.as_ref().is_some_and(|b| !b.is_form()) && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
    }

    if spec.method().is_mutating() && !headers.contains_key(&IDEMPOTENCY_KEY) {
        if let Some(key) = idempotency_key {
            headers.insert(IDEMPOTENCY_KEY, header_value(IDEMPOTENCY_HEADER, key)?);
        }
    }

    Ok(headers)
}

/// Header names for logs; values are never included.
pub fn header_names(headers: &HeaderMap) -> Vec<&str> {
    headers.keys().map(HeaderName::as_str).collect()
}

fn header_name(name: &str) -> Result<HeaderName, ApiError> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid header name '{name}': {e}")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid value for header '{name}': {e}")))
}
