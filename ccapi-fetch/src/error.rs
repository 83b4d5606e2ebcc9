//! Request layer error types.
//!
//! [`ApiError`] is what callers of the facade see. Its variants follow the
//! failure taxonomy of the executor: network failures and retryable statuses
//! are recovered locally until the retry budget runs out, everything else
//! surfaces as a distinguishable variant.

use thiserror::Error;

// ============================================================================
// Error Codes
// ============================================================================

/// Machine-readable code for an [`ApiError`].
pub mod codes {
    /// No usable access token (mutating verb, or 403 without a token).
    pub const UNAUTHENTICATED_NO_TOKEN: &str = "UNAUTHENTICATED_NO_TOKEN";
    /// 401 whose token refresh failed or was impossible.
    pub const REFRESH_FAILED: &str = "REFRESH_FAILED";
    /// Daily reward already claimed.
    pub const ALREADY_CLAIMED: &str = "already_claimed";
    /// Any other non-2xx response.
    pub const HTTP_ERROR: &str = "HTTP_ERROR";
    /// No response received.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    /// The request could not be built.
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    /// The response could not be read or decoded.
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
}

/// Canonical detail carried by every [`ApiError::DuplicateClaim`], whichever
/// phrasing the backend used.
pub const DUPLICATE_CLAIM_DETAIL: &str =
    r#"{"detail":"한 회원당 하루에 1번만 연속 보상을 받을 수 있습니다"}"#;

// ============================================================================
// API Error
// ============================================================================

/// Error returned by the request executor and the facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received and the retry budget is spent.
    #[error("Network failure: {0}")]
    Network(#[from] TransportError),

    /// Authentication required but no usable access token is stored.
    ///
    /// `status` is 401 for the pre-flight short-circuit on mutating verbs and
    /// 403 when the backend rejected an unauthenticated request.
    #[error("UNAUTHENTICATED_NO_TOKEN")]
    Unauthenticated {
        /// HTTP status associated with the failure.
        status: u16,
    },

    /// The backend answered 401 and the token refresh failed or was impossible.
    ///
    /// The token store has been cleared.
    #[error("Token refresh failed ({status}): {body}")]
    RefreshFailed {
        /// Status of the original response.
        status: u16,
        /// Body of the original response.
        body: String,
    },

    /// The daily reward was already claimed.
    #[error("already_claimed {detail}")]
    DuplicateClaim {
        /// Canonical detail text ([`DUPLICATE_CLAIM_DETAIL`]).
        detail: String,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request could not be built (bad header, unserializable body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The response payload did not match the requested type.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Creates the canonical duplicate-claim error.
    pub fn duplicate_claim() -> Self {
        Self::DuplicateClaim {
            detail: DUPLICATE_CLAIM_DETAIL.to_string(),
        }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => codes::NETWORK_ERROR,
            Self::Unauthenticated { .. } => codes::UNAUTHENTICATED_NO_TOKEN,
            Self::RefreshFailed { .. } => codes::REFRESH_FAILED,
            Self::DuplicateClaim { .. } => codes::ALREADY_CLAIMED,
            Self::Http { .. } => codes::HTTP_ERROR,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::InvalidResponse(_) | Self::Decode(_) => codes::INVALID_RESPONSE,
        }
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated { status }
            | Self::RefreshFailed { status, .. }
            | Self::Http { status, .. } => Some(*status),
            Self::DuplicateClaim { .. } => Some(400),
            _ => None,
        }
    }

    /// Returns true if the caller should treat this as "not signed in".
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. } | Self::RefreshFailed { .. }
        )
    }

    /// Returns true if no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// Failure to obtain any response from the backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request error from the HTTP stack (connect, TLS, timeout, ...).
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The caller's cancellation token fired before a response arrived.
    #[error("Request cancelled")]
    Cancelled,

    /// The request could not be built locally; nothing was sent.
    #[error("Request could not be built: {0}")]
    Build(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Classifies a reqwest error; builder failures never reached the network.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_builder() {
            Self::Build(error.to_string())
        } else {
            Self::Request(error)
        }
    }

    /// Returns true if retrying cannot help: the request was never sent.
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }
}
