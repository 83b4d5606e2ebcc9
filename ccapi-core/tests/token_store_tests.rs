//! Integration tests for the token store contract.

use std::sync::Arc;

use ccapi_core::{MemoryTokenStore, TokenBundle, TokenStore};

#[tokio::test]
async fn test_store_is_usable_as_trait_object() {
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    assert!(!store.has_access_token().await);

    store
        .set(TokenBundle::new("access", Some("refresh".to_string())))
        .await;
    assert_eq!(store.access_token().await.as_deref(), Some("access"));
}

#[tokio::test]
async fn test_concurrent_writers_leave_one_bundle() {
    let store = Arc::new(MemoryTokenStore::new());

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.set(TokenBundle::new(format!("access-{i}"), None)).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let token = store.access_token().await.unwrap();
    assert!(token.starts_with("access-"));
}
