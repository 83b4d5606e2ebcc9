//! Credential bundle types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Token Bundle
// ============================================================================

/// Access/refresh token pair persisted by a [`crate::TokenStore`].
///
/// The request layer only ever holds transient copies of a bundle for the
/// duration of one logical request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    /// Bearer token attached to authenticated requests.
    pub access_token: String,
    /// Token exchanged at the refresh endpoint when the access token expires.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenBundle {
    /// Creates a bundle.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Returns true if the bundle carries a non-empty access token.
    ///
    /// A bundle with an empty access token is equivalent to no bundle for
    /// authorization purposes.
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Returns the refresh token if one is present and non-empty.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Consumes the bundle, returning the access token if it is usable.
    pub fn into_access_token(self) -> Option<String> {
        if self.has_access_token() {
            Some(self.access_token)
        } else {
            None
        }
    }

    /// Builds the bundle stored after a successful refresh.
    ///
    /// The previous refresh token is kept when the refresh response did not
    /// rotate it.
    pub fn refreshed(&self, access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| self.refresh_token.clone()),
        }
    }

    /// Returns a masked form of the access token, safe for display.
    pub fn masked_access_token(&self) -> String {
        mask(&self.access_token)
    }
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask))
            .finish()
    }
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
