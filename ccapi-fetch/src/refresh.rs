//! Refresh-token exchange.
//!
//! [`RefreshCoordinator::refresh_once`] trades the stored refresh token for a
//! new access token. It never fails loudly: every problem (no refresh token,
//! network error, non-2xx, unparseable body) comes back as `false` and the
//! store is left untouched.

use std::sync::Arc;

use ccapi_core::{HttpMethod, TokenStore};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::headers::JSON_MIME;
use crate::host::{HttpRequest, Transport};
use crate::request::{RequestBody, build_url};

/// Path of the refresh endpoint, relative to the API prefix.
pub const REFRESH_PATH: &str = "auth/refresh";

/// Body of a successful refresh response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Exchanges refresh tokens and writes the result back to the store.
#[derive(Clone)]
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    origin: String,
}

impl RefreshCoordinator {
    /// Creates a coordinator targeting `origin`.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            origin: origin.into(),
        }
    }

    /// Returns the refresh endpoint URL.
    pub fn url(&self) -> String {
        build_url(&self.origin, REFRESH_PATH)
    }

    /// Performs one refresh exchange.
    ///
    /// Returns true iff a new access token was obtained and stored. Without a
    /// stored refresh token no request is made.
    #[instrument(skip(self, cancel))]
    pub async fn refresh_once(&self, cancel: Option<&CancellationToken>) -> bool {
        let Some(current) = self.store.get().await else {
            debug!("No stored tokens, skipping refresh");
            return false;
        };
        let Some(refresh_token) = current.usable_refresh_token() else {
            debug!("No refresh token, skipping refresh");
            return false;
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.url(),
            headers,
            body: Some(RequestBody::Json(json!({ "refresh_token": refresh_token }))),
            cancel: cancel.cloned(),
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return false;
            }
        };

        if !response.is_success() {
            debug!(status = response.status, "Token refresh rejected");
            return false;
        }

        let parsed = response
            .body
            .as_deref()
            .and_then(|body| serde_json::from_str::<RefreshResponse>(body).ok());
        let Some(RefreshResponse {
            access_token: Some(access_token),
            refresh_token,
        }) = parsed
        else {
            warn!("Token refresh response carried no access token");
            return false;
        };
        if access_token.is_empty() {
            warn!("Token refresh response carried an empty access token");
            return false;
        }

        self.store
            .set(current.refreshed(access_token, refresh_token))
            .await;
        debug!("Access token refreshed");
        true
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
