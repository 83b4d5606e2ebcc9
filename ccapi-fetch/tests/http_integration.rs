//! End-to-end tests of the reqwest transport against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use ccapi_core::{HttpMethod, MemoryTokenStore, TokenBundle, TokenStore};
use ccapi_fetch::idempotency::is_uuid_v4;
use ccapi_fetch::{
    ApiClient, ApiError, ClientConfig, FormField, FormValue, RequestBody, RequestOptions,
    TransportError,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, store: Arc<MemoryTokenStore>) -> ApiClient {
    ApiClient::builder()
        .store(store)
        .origin(server.uri())
        .config(ClientConfig::default().with_dev_mode(false))
        .build()
        .expect("client")
}

fn signed_in() -> Arc<MemoryTokenStore> {
    Arc::new(MemoryTokenStore::with_tokens(TokenBundle::new(
        "access-1",
        Some("refresh-1".to_string()),
    )))
}

#[tokio::test]
async fn test_post_sends_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/rewards/claim"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "reward_id": 3, "note": "일일 보상" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "gold": 10 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let result: Value = client
        .post("/rewards/claim", &json!({ "reward_id": 3, "note": "일일 보상" }))
        .await
        .unwrap();

    assert_eq!(result, json!({ "gold": 10 }));

    let requests = server.received_requests().await.unwrap();
    let key = requests[0]
        .headers
        .get("x-idempotency-key")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(is_uuid_v4(key));
}

#[tokio::test]
async fn test_get_without_token_never_hits_the_network() {
    let server = MockServer::start().await;
    let client = client(&server, Arc::new(MemoryTokenStore::new()));

    let result: Option<Value> = client.get("users/me").await.unwrap();

    assert!(result.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in();
    let client = client(&server, store.clone());
    let me: Option<Value> = client.get("users/me").await.unwrap();

    assert_eq!(me, Some(json!({ "id": 1 })));
    let stored = store.get().await.unwrap();
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_rejected_refresh_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/sessions/current"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in();
    let client = client(&server, store.clone());
    let err = client.delete::<Value>("sessions/current").await.unwrap_err();

    assert!(matches!(err, ApiError::RefreshFailed { status: 401, .. }));
    assert!(!client.has_access_token().await);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "streak": 4 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let result: Option<Value> = client
        .get_with("dashboard", RequestOptions::new().backoff_ms(10))
        .await
        .unwrap();

    assert_eq!(result, Some(json!({ "streak": 4 })));
}

#[tokio::test]
async fn test_retry_budget_exhaustion_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/games/list"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let err = client
        .get_with::<Value>("games/list", RequestOptions::new().retry(1).backoff_ms(5))
        .await
        .unwrap_err();

    assert!(matches!(&err, ApiError::Http { status: 429, body } if body == "slow down"));
}

#[tokio::test]
async fn test_duplicate_claim_from_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/streak/claim"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "detail": "Reward already claimed" })),
        )
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let err = client.post::<Value, _>("streak/claim", &json!({})).await.unwrap_err();

    assert!(matches!(err, ApiError::DuplicateClaim { .. }));
    assert!(err.to_string().starts_with("already_claimed "));
}

#[tokio::test]
async fn test_cookies_are_kept_between_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc; Path=/")
                .set_body_json(json!({ "ok": true })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(MemoryTokenStore::new()));
    let _: Value = client
        .post_with("auth/login", RequestOptions::new().no_auth())
        .await
        .unwrap();
    let me: Option<Value> = client
        .get_with("auth/me", RequestOptions::new().no_auth())
        .await
        .unwrap();

    assert_eq!(me, Some(json!({ "id": 9 })));
}

#[tokio::test]
async fn test_form_upload_uses_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/users/me/avatar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let body = RequestBody::Form(vec![
        FormField::text("caption", "me"),
        FormField::file("avatar", vec![0x89, 0x50, 0x4e, 0x47], Some("a.png".to_string())),
    ]);
    let _: Value = client
        .request("users/me/avatar", RequestOptions::new().method(HttpMethod::Put).body(body))
        .await
        .unwrap()
        .unwrap()
        .into_json();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"), "{content_type}");
    assert!(requests[0].headers.get("x-idempotency-key").is_some());
}

#[tokio::test]
async fn test_cancellation_aborts_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .get_with::<Value>("slow", RequestOptions::new().retry(0).cancel(cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(TransportError::Cancelled)));
}

#[tokio::test]
async fn test_unbuildable_form_fails_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let client = client(&server, signed_in());
    let body = RequestBody::Form(vec![FormField {
        name: "avatar".to_string(),
        value: FormValue::File {
            bytes: vec![1, 2, 3],
            file_name: Some("a.png".to_string()),
            mime: Some("not a mime".to_string()),
        },
    }]);
    let start = std::time::Instant::now();
    let err = client
        .request(
            "users/me/avatar",
            RequestOptions::new()
                .method(HttpMethod::Post)
                .body(body)
                .retry(2)
                .backoff_ms(200),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)), "{err:?}");
    assert!(start.elapsed() < Duration::from_millis(150));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_covers_slow_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        // Headers promise more bytes than are ever sent.
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"partial\"")
            .await;
        let _ = socket.flush().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let client = ApiClient::builder()
        .store(signed_in())
        .origin(format!("http://{addr}"))
        .config(ClientConfig::default().with_dev_mode(false))
        .build()
        .expect("client");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = std::time::Instant::now();
    let err = client
        .get_with::<Value>("slow-body", RequestOptions::new().no_auth().retry(0).cancel(cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(TransportError::Cancelled)), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(2));
}
