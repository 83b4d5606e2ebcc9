//! JSON output formatting.

use anyhow::Result;
use ccapi_fetch::ApiError;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// Stored token summary; secrets are masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOutput {
    pub backend: String,
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub has_refresh_token: bool,
}

/// Client status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub context: String,
    pub build_id: String,
    pub origin: String,
    pub dev_mode: bool,
    pub token: TokenOutput,
}

/// A failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorOutput<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    message: String,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter for CLI output.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a request error as `{code, status, message}`.
    pub fn format_error(&self, error: &ApiError) -> Result<String> {
        self.format(&ErrorOutput {
            code: error.code(),
            status: error.status(),
            message: error.to_string(),
        })
    }
}
