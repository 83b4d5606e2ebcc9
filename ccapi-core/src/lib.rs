// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ccapi` Core
//!
//! Core types, models, and collaborator traits for the `ccapi` request layer.
//!
//! This crate provides the foundational abstractions used across all other
//! `ccapi` crates, including:
//!
//! - Domain models (token bundles, HTTP verbs)
//! - Error types
//! - The [`TokenStore`] collaborator trait consumed by the request executor
//! - An in-process [`MemoryTokenStore`]
//!
//! ## Key Types
//!
//! - [`TokenBundle`] - Access/refresh token pair owned by a token store
//! - [`HttpMethod`] - Verbs the executor knows how to issue
//! - [`TokenStore`] - `get` / `set` / `clear` over persisted credentials

pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{HttpMethod, TokenBundle};

// Re-export traits and the in-memory store
pub use memory::MemoryTokenStore;
pub use traits::TokenStore;
