//! Domain models for `ccapi`.
//!
//! ## Submodules
//!
//! - [`token`] - Credential bundle held by a token store
//! - [`method`] - HTTP verbs issued by the request executor

mod method;
mod token;

// Re-export everything at the models level
pub use method::HttpMethod;
pub use token::TokenBundle;
