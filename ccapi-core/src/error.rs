//! Core error types for `ccapi`.

use thiserror::Error;

/// Core error type for `ccapi` operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Unsupported or malformed HTTP method name.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
}
