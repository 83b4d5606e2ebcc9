//! Convenience facade.
//!
//! [`ApiClient`] wraps a [`RequestExecutor`] with per-verb helpers that fix
//! the method and decode the JSON payload with serde. All other options are
//! forwarded unchanged.

use std::sync::Arc;

use ccapi_core::{HttpMethod, MemoryTokenStore, TokenStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::context::ClientConfig;
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::host::{HttpClient, Transport};
use crate::idempotency::IdempotencyKeyGenerator;
use crate::origin::{OriginResolver, process_origin};
use crate::request::{ApiResponse, RequestOptions, RequestSpec};

/// Path of the dashboard aggregate.
pub const DASHBOARD_PATH: &str = "dashboard";

// ============================================================================
// Api Client
// ============================================================================

/// Resilient API client.
///
/// Cheap to clone; clones share the transport, token store and key
/// generator.
#[derive(Debug, Clone)]
pub struct ApiClient {
    executor: RequestExecutor,
    config: ClientConfig,
}

impl ApiClient {
    /// Creates a client from a config with the reqwest transport and an
    /// in-memory token store.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Creates a builder.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Returns the origin every request targets.
    pub fn origin(&self) -> &str {
        self.executor.origin()
    }

    /// Returns the config the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the token store.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        self.executor.store()
    }

    /// Runs a request with explicit options.
    ///
    /// `None` means an authenticated GET was skipped for lack of a token.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<ApiResponse>, ApiError> {
        self.executor.execute(RequestSpec::new(path, options)).await
    }

    /// GET, decoded. `None` when signed out.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.get_with(path, RequestOptions::new()).await
    }

    /// GET with options, decoded. `None` when signed out.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>, ApiError> {
        self.request(path, options.method(HttpMethod::Get))
            .await?
            .map(ApiResponse::decode)
            .transpose()
    }

    /// GET returning the raw body text. `None` when signed out.
    pub async fn get_text(&self, path: &str) -> Result<Option<String>, ApiError> {
        let response = self
            .request(path, RequestOptions::new().method(HttpMethod::Get).text())
            .await?;
        Ok(response.map(|r| match r {
            ApiResponse::Text(text) => text,
            ApiResponse::Json(value) => value.to_string(),
        }))
    }

    /// POST a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_with(path, RequestOptions::new().json(body)?).await
    }

    /// POST with options.
    pub async fn post_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(HttpMethod::Post, path, options).await
    }

    /// PUT a JSON body.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.put_with(path, RequestOptions::new().json(body)?).await
    }

    /// PUT with options.
    pub async fn put_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(HttpMethod::Put, path, options).await
    }

    /// PATCH a JSON body.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.patch_with(path, RequestOptions::new().json(body)?).await
    }

    /// PATCH with options.
    pub async fn patch_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(HttpMethod::Patch, path, options).await
    }

    /// DELETE.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.delete_with(path, RequestOptions::new()).await
    }

    /// DELETE with options.
    pub async fn delete_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(HttpMethod::Delete, path, options).await
    }

    /// Returns true if a non-empty access token is stored.
    pub async fn has_access_token(&self) -> bool {
        self.store().has_access_token().await
    }

    /// Fetches the dashboard aggregate. `None` when signed out.
    pub async fn dashboard(&self) -> Result<Option<Value>, ApiError> {
        self.get(DASHBOARD_PATH).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request(path, options.method(method)).await?;
        let value = response.map_or(Value::Null, ApiResponse::into_json);
        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// Api Client Builder
// ============================================================================

/// Builder for constructing an [`ApiClient`].
#[derive(Default)]
pub struct ApiClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn TokenStore>>,
    keys: Option<Arc<IdempotencyKeyGenerator>>,
    origin: Option<String>,
    config: ClientConfig,
}

impl ApiClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport. Defaults to [`HttpClient`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the token store. Defaults to a [`MemoryTokenStore`].
    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the idempotency key generator.
    pub fn key_generator(mut self, keys: Arc<IdempotencyKeyGenerator>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Targets `origin` instead of resolving one.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the config.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the client.
    ///
    /// Without an explicit origin the process-wide origin is used; it is
    /// resolved from this builder's config the first time any client in the
    /// process is built.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpClient::with_options(config.timeout, &config.user_agent)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        let origin = match self.origin {
            Some(origin) => origin.trim().trim_end_matches('/').to_string(),
            None => {
                let resolver = OriginResolver::new(config.context.clone(), config.origins.clone());
                process_origin(&resolver).to_string()
            }
        };

        if config.log_enabled {
            info!(
                ctx = %config.context,
                build = %config.build_id,
                origin = %origin,
                "API client initialized"
            );
        }

        let mut executor = RequestExecutor::new(transport, store, origin)
            .with_logging(config.log_enabled)
            .with_dev_mode(config.dev_mode);
        if let Some(keys) = self.keys {
            executor = executor.with_key_generator(keys);
        }

        Ok(ApiClient { executor, config })
    }
}

impl std::fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("origin", &self.origin)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use ccapi_core::TokenBundle;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::testing::ScriptedTransport;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        id: u64,
        nickname: String,
    }

    fn client(transport: &Arc<ScriptedTransport>, tokens: Option<TokenBundle>) -> ApiClient {
        let store = Arc::new(tokens.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_tokens));
        ApiClient::builder()
            .transport(transport.clone())
            .store(store)
            .origin("http://api.test/")
            .build()
            .unwrap()
    }

    fn signed_in() -> Option<TokenBundle> {
        Some(TokenBundle::new("access-1", None))
    }

    #[tokio::test]
    async fn test_get_decodes() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, r#"{"id":7,"nickname":"kim"}"#));
        let client = client(&transport, signed_in());

        let profile: Option<Profile> = client.get("/auth/me").await.unwrap();
        assert_eq!(
            profile,
            Some(Profile {
                id: 7,
                nickname: "kim".to_string()
            })
        );
        assert_eq!(transport.calls()[0].url, "http://api.test/api/auth/me");
    }

    #[tokio::test]
    async fn test_get_signed_out_is_none() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client(&transport, None);

        let profile: Option<Profile> = client.get("auth/me").await.unwrap();
        assert!(profile.is_none());
        assert!(client.dashboard().await.unwrap().is_none());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_verbs_fix_the_method() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, r#"{"ok":1}"#)
                .reply(200, r#"{"ok":2}"#)
                .reply(200, r#"{"ok":3}"#)
                .reply(200, r#"{"ok":4}"#),
        );
        let client = client(&transport, signed_in());
        let body = json!({ "x": 1 });

        let _: Value = client.post("a", &body).await.unwrap();
        let _: Value = client.put("a", &body).await.unwrap();
        let _: Value = client.patch("a", &body).await.unwrap();
        let last: Value = client.delete("a").await.unwrap();

        let methods: Vec<HttpMethod> = transport.calls().iter().map(|c| c.method).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch, HttpMethod::Delete]
        );
        assert_eq!(last, json!({ "ok": 4 }));
        assert_eq!(transport.calls()[0].json_body(), Some(&body));
    }

    #[tokio::test]
    async fn test_with_variant_overrides_method() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, "null"));
        let client = client(&transport, signed_in());

        let options = RequestOptions::new().method(HttpMethod::Get).retry(0);
        let result: Option<Value> = client.post_with("a", options).await.unwrap();

        assert!(result.is_none());
        assert_eq!(transport.calls()[0].method, HttpMethod::Post);
    }

    #[tokio::test]
    async fn test_post_signed_out_fails() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client(&transport, None);

        let err = client.post::<Value, _>("a", &json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated { status: 401 }));
    }

    #[tokio::test]
    async fn test_decode_mismatch() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, r#"{"id":"x"}"#));
        let client = client(&transport, signed_in());

        let err = client.get::<Profile>("auth/me").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_text() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, "# Terms"));
        let client = client(&transport, signed_in());

        assert_eq!(client.get_text("legal/terms").await.unwrap().as_deref(), Some("# Terms"));
    }

    #[tokio::test]
    async fn test_has_access_token() {
        let transport = Arc::new(ScriptedTransport::new());
        assert!(client(&transport, signed_in()).has_access_token().await);
        assert!(!client(&transport, None).has_access_token().await);
        assert!(
            !client(&transport, Some(TokenBundle::new("", None)))
                .has_access_token()
                .await
        );
    }

    #[tokio::test]
    async fn test_dashboard() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, r#"{"streak":3}"#));
        let client = client(&transport, signed_in());

        assert_eq!(client.dashboard().await.unwrap(), Some(json!({ "streak": 3 })));
        assert_eq!(transport.calls()[0].url, "http://api.test/api/dashboard");
    }

    #[test]
    fn test_origin_override_is_trimmed() {
        let transport = Arc::new(ScriptedTransport::new());
        assert_eq!(client(&transport, None).origin(), "http://api.test");
    }
}
