// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ccapi` Fetch
//!
//! Resilient request layer between application code and the backend API.
//!
//! Every call goes through the same pipeline:
//!
//! 1. Resolve the backend origin once ([`origin`])
//! 2. Gate on a stored access token and assemble headers, including an
//!    idempotency key for mutating verbs ([`headers`], [`idempotency`])
//! 3. Send through a [`Transport`] and classify the outcome: retry with
//!    exponential backoff, refresh the token once on 401, or fail with a
//!    classified [`ApiError`] ([`executor`], [`refresh`], [`retry`])
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP transport seam and the reqwest implementation
//!
//! ## Example
//!
//! ```ignore
//! use ccapi_fetch::{ApiClient, ClientConfig, ExecutionContext};
//!
//! let client = ApiClient::new(ClientConfig::from_env(ExecutionContext::Server))?;
//!
//! // `None` when signed out
//! let profile: Option<Profile> = client.get("auth/me").await?;
//!
//! // Carries a fresh X-Idempotency-Key
//! let reward: Reward = client.post("rewards/claim", &claim).await?;
//! ```

// Core modules
pub mod client;
pub mod context;
pub mod error;
pub mod executor;
pub mod guard;
pub mod headers;
pub mod host;
pub mod idempotency;
pub mod origin;
pub mod refresh;
pub mod request;
pub mod retry;

#[cfg(test)]
mod testing;

// Re-export key types at crate root

// Errors
pub use error::{ApiError, TransportError, codes};

// Host APIs
pub use host::{HttpClient, HttpRequest, HttpResponse, Transport};

// Request pipeline
pub use client::{ApiClient, ApiClientBuilder};
pub use context::ClientConfig;
pub use executor::RequestExecutor;
pub use idempotency::{IDEMPOTENCY_HEADER, IdempotencyKeyGenerator, KeySource};
pub use origin::{ExecutionContext, OriginConfig, OriginResolver, process_origin};
pub use refresh::RefreshCoordinator;
pub use request::{
    ApiResponse, FormField, FormValue, RequestBody, RequestOptions, RequestSpec, ResponseMode,
};
pub use retry::RetryPolicy;
