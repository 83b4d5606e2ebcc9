//! Token bundle stored in the system keychain.
//!
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)
//!
//! The bundle is stored as JSON under one service/account pair. `keyring` is
//! synchronous, so every call runs on the blocking pool.

use async_trait::async_trait;
use ccapi_core::{TokenBundle, TokenStore};
use keyring::Entry;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;

/// Default keychain service name.
pub const DEFAULT_SERVICE: &str = "ccapi";

/// Default keychain account name.
pub const DEFAULT_ACCOUNT: &str = "auth_tokens";

/// Keychain-backed [`TokenStore`].
#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    service: String,
    account: String,
}

impl KeychainTokenStore {
    /// Creates a store under the default service and account.
    pub fn new() -> Self {
        Self::with_entry(DEFAULT_SERVICE, DEFAULT_ACCOUNT)
    }

    /// Creates a store under a custom service and account.
    pub fn with_entry(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    /// Returns the service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Reads the bundle.
    pub async fn load(&self) -> Result<Option<TokenBundle>, StoreError> {
        let entry = self.entry()?;
        let secret = tokio::task::spawn_blocking(move || match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        })
        .await
        .map_err(|e| StoreError::Keychain(format!("Keychain task failed: {e}")))??;

        Ok(secret.as_deref().and_then(decode))
    }

    /// Writes the bundle.
    pub async fn save(&self, tokens: &TokenBundle) -> Result<(), StoreError> {
        let entry = self.entry()?;
        let secret = serde_json::to_string(tokens)?;
        tokio::task::spawn_blocking(move || entry.set_password(&secret))
            .await
            .map_err(|e| StoreError::Keychain(format!("Keychain task failed: {e}")))??;
        debug!(service = %self.service, "Tokens stored in keychain");
        Ok(())
    }

    /// Deletes the entry; a missing entry is not an error.
    pub async fn remove(&self) -> Result<(), StoreError> {
        let entry = self.entry()?;
        tokio::task::spawn_blocking(move || match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::from(e)),
        })
        .await
        .map_err(|e| StoreError::Keychain(format!("Keychain task failed: {e}")))??;
        debug!(service = %self.service, "Tokens deleted from keychain");
        Ok(())
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl Default for KeychainTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for KeychainTokenStore {
    #[instrument(skip(self), fields(service = %self.service))]
    async fn get(&self) -> Option<TokenBundle> {
        self.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read tokens from keychain");
            None
        })
    }

    #[instrument(skip(self, tokens), fields(service = %self.service))]
    async fn set(&self, tokens: TokenBundle) {
        if let Err(e) = self.save(&tokens).await {
            warn!(error = %e, "Failed to store tokens in keychain");
        }
    }

    #[instrument(skip(self), fields(service = %self.service))]
    async fn clear(&self) {
        if let Err(e) = self.remove().await {
            warn!(error = %e, "Failed to delete tokens from keychain");
        }
    }
}

/// Decodes a stored secret: a bundle, or a bare access token.
fn decode(secret: &str) -> Option<TokenBundle> {
    let secret = secret.trim();
    if secret.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(secret) {
        Ok(serde_json::Value::Object(_)) => serde_json::from_str::<TokenBundle>(secret).ok(),
        Ok(serde_json::Value::String(token)) => {
            (!token.is_empty() && !token.contains(char::is_whitespace))
                .then(|| TokenBundle::new(token, None))
        }
        Ok(_) => None,
        Err(_) if !secret.contains(char::is_whitespace) => Some(TokenBundle::new(secret, None)),
        Err(_) => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_entry() {
        let store = KeychainTokenStore::default();
        assert_eq!(store.service(), "ccapi");
        assert_eq!(store.account, "auth_tokens");
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            decode(r#"{"access_token":"a","refresh_token":"r"}"#),
            Some(TokenBundle::new("a", Some("r".to_string())))
        );
        assert_eq!(decode("bare-token"), Some(TokenBundle::new("bare-token", None)));
        assert_eq!(decode("  "), None);
        assert_eq!(decode(r#""quoted""#), Some(TokenBundle::new("quoted", None)));
    }

    #[test]
    fn test_decode_rejects_foreign_json() {
        assert_eq!(decode(r#"{"token":"a"}"#), None);
        assert_eq!(decode("[1,2]"), None);
        assert_eq!(decode("not a token"), None);
        assert_eq!(decode(r#""not a token""#), None);
    }

    // Actual keychain round-trips need platform access and are not run here.
}
