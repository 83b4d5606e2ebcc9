//! Collaborator traits for `ccapi`.
//!
//! The request layer never owns persisted credentials. It consumes them
//! through [`TokenStore`], which backends in `ccapi-store` (file, keychain)
//! and [`crate::MemoryTokenStore`] implement.

use async_trait::async_trait;

use crate::models::TokenBundle;

/// Persisted credential bundle consumed by the request executor.
///
/// The contract is deliberately infallible: a backend that cannot read its
/// storage reports "no bundle", and a backend that cannot write logs the
/// failure and carries on. Implementations must be safe to call from any
/// task; concurrent writers are the backend's concern.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the stored bundle, if any.
    async fn get(&self) -> Option<TokenBundle>;

    /// Replaces the stored bundle.
    async fn set(&self, tokens: TokenBundle);

    /// Removes any stored bundle.
    async fn clear(&self);

    /// Returns the access token if the stored bundle holds a usable one.
    ///
    /// An empty access token is treated the same as no bundle.
    async fn access_token(&self) -> Option<String> {
        self.get().await.and_then(TokenBundle::into_access_token)
    }

    /// Returns true if a usable access token is stored.
    async fn has_access_token(&self) -> bool {
        self.access_token().await.is_some()
    }
}
