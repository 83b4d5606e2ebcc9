//! Token bundle persisted as a JSON file.
//!
//! Earlier clients stored only the access token, as a bare string. Such a
//! file is read as a bundle without a refresh token and rewritten in the
//! bundle format on first read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ccapi_core::{TokenBundle, TokenStore};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{default_tokens_path, remove_file, save_json};

/// How the file contents were interpreted.
#[derive(Debug, PartialEq, Eq)]
enum Stored {
    Bundle(TokenBundle),
    Legacy(TokenBundle),
}

/// File-backed [`TokenStore`].
///
/// Operations are serialized through an async lock so concurrent refreshes
/// in one process never interleave partial writes.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Creates a store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store at the default tokens path.
    pub fn at_default_path() -> Self {
        Self::new(default_tokens_path())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the bundle, migrating a legacy file in place.
    pub async fn load(&self) -> Result<Option<TokenBundle>, StoreError> {
        let _guard = self.lock.lock().await;

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match parse(&content) {
            Some(Stored::Bundle(tokens)) => Ok(Some(tokens)),
            Some(Stored::Legacy(tokens)) => {
                info!(path = %self.path.display(), "Migrating legacy token file");
                save_json(&self.path, &tokens).await?;
                Ok(Some(tokens))
            }
            None => {
                debug!(path = %self.path.display(), "Token file is empty or unreadable");
                Ok(None)
            }
        }
    }

    /// Writes the bundle.
    pub async fn save(&self, tokens: &TokenBundle) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        save_json(&self.path, tokens).await
    }

    /// Deletes the file.
    pub async fn remove(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        remove_file(&self.path).await
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self) -> Option<TokenBundle> {
        self.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read token file");
            None
        })
    }

    #[instrument(skip(self, tokens), fields(path = %self.path.display()))]
    async fn set(&self, tokens: TokenBundle) {
        if let Err(e) = self.save(&tokens).await {
            warn!(error = %e, "Failed to write token file");
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) {
        if let Err(e) = self.remove().await {
            warn!(error = %e, "Failed to remove token file");
        }
    }
}

/// Interprets stored contents: a bundle object, a JSON string, or bare text.
fn parse(content: &str) -> Option<Stored> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(_)) => serde_json::from_str::<TokenBundle>(trimmed)
            .ok()
            .map(Stored::Bundle),
        Ok(serde_json::Value::String(token)) => legacy(token),
        Ok(_) => None,
        Err(_) if !trimmed.contains(char::is_whitespace) => legacy(trimmed.to_string()),
        Err(_) => None,
    }
}

fn legacy(token: String) -> Option<Stored> {
    (!token.is_empty()).then(|| Stored::Legacy(TokenBundle::new(token, None)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> FileTokenStore {
        FileTokenStore::new(dir.path().join("auth").join("tokens.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_no_bundle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.get().await.is_none());
        assert!(!store.has_access_token().await);
    }

    #[tokio::test]
    async fn test_set_get_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let tokens = TokenBundle::new("a1", Some("r1".to_string()));

        store.set(tokens.clone()).await;
        assert_eq!(store.get().await, Some(tokens));
        assert_eq!(store.access_token().await.as_deref(), Some("a1"));

        store.clear().await;
        assert!(store.get().await.is_none());
        assert!(!store.path().exists());

        // Clearing twice is fine.
        store.clear().await;
    }

    #[tokio::test]
    async fn test_legacy_bare_token_is_migrated() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        tokio::fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        tokio::fs::write(store.path(), "eyJhbGciOi.legacy\n").await.unwrap();

        let tokens = store.get().await.unwrap();
        assert_eq!(tokens, TokenBundle::new("eyJhbGciOi.legacy", None));

        let rewritten: TokenBundle =
            serde_json::from_str(&tokio::fs::read_to_string(store.path()).await.unwrap()).unwrap();
        assert_eq!(rewritten, tokens);
    }

    #[tokio::test]
    async fn test_legacy_json_string_is_migrated() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        tokio::fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        tokio::fs::write(store.path(), r#""legacy-token""#).await.unwrap();

        assert_eq!(store.get().await, Some(TokenBundle::new("legacy-token", None)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            parse(r#"{"access_token":"a","refresh_token":null}"#),
            Some(Stored::Bundle(TokenBundle::new("a", None)))
        );
        assert_eq!(parse(""), None);
        assert_eq!(parse("[1,2]"), None);
        assert_eq!(parse(r#"{"token":"a"}"#), None);
        assert_eq!(parse("not a token"), None);
        assert_eq!(parse(r#""""#), None);
    }
}
