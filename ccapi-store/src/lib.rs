// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `ccapi` Store
//!
//! Persistence for the `ccapi` request layer.
//!
//! This crate provides:
//!
//! - **`FileTokenStore`**: Token bundle in a 0600 JSON file, with legacy migration
//! - **`KeychainTokenStore`**: Token bundle in the system keychain
//! - **`Settings`**: Client settings with an environment overlay
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use ccapi_fetch::{ApiClient, ExecutionContext};
//! use ccapi_store::SettingsStore;
//!
//! let settings = SettingsStore::load_default().await.get().await;
//!
//! let client = ApiClient::builder()
//!     .config(settings.client_config_from_env(ExecutionContext::Server))
//!     .store(settings.open_token_store())
//!     .build()?;
//! ```

pub mod error;
pub mod file_store;
pub mod keychain;
pub mod persistence;
pub mod settings;

pub use error::StoreError;
pub use file_store::FileTokenStore;
pub use keychain::KeychainTokenStore;
pub use persistence::{
    default_config_dir, default_settings_path, default_tokens_path, load_json,
    load_json_or_default, remove_file, save_json,
};
pub use settings::{Settings, SettingsStore, TokenBackend, open_token_store};
