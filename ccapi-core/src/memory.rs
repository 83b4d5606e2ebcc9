//! In-process token store.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::models::TokenBundle;
use crate::traits::TokenStore;

/// Token store that keeps the bundle in memory for the life of the process.
///
/// Useful for tests, short-lived tools, and as the `memory` backend of the
/// CLI.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<TokenBundle>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with a bundle.
    pub fn with_tokens(tokens: TokenBundle) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Option<TokenBundle> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn set(&self, tokens: TokenBundle) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    async fn clear(&self) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
