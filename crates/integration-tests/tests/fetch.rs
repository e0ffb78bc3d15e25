//! Fetch hook against the mock backend over real HTTP.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::{Value, json};
use shopfront_client::messages;
use shopfront_client::{FetchOptions, FetchPhase, RequestError, Shopfront};
use shopfront_integration_tests::{MockBackend, init_tracing, token_expiring_in};

#[tokio::test]
async fn test_first_read_hits_network_once() {
    let backend = MockBackend::start().await;
    init_tracing(&backend.config());
    let client = backend.client();
    let products = client.use_fetch(Some("/products?delay_ms=100"), FetchOptions::default());
    let mut rx = products.subscribe();
    assert!(!rx.borrow_and_update().loading);

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let loading = rx.borrow_and_update().loading;
            seen.push(loading);
            if !loading {
                break;
            }
        }
        seen
    });

    let state = products.load().await;
    let seen = observer.await.expect("observer panicked");

    assert_eq!(backend.hits("GET", "/products"), 1);
    assert_eq!(seen.first(), Some(&true));
    assert_eq!(seen.last(), Some(&false));
    assert!(!state.loading);
    assert_eq!(state.phase, FetchPhase::Success);
    let data = state.data.expect("no data");
    assert_eq!(data.as_array().map(Vec::len), Some(2));
    assert_eq!(data[0]["name"], json!("Áo dài lụa"));
}

#[tokio::test]
async fn test_cached_read_performs_no_request() {
    let backend = MockBackend::start().await;
    let client = backend.client();

    let first = client
        .use_fetch(Some("/products"), FetchOptions::default())
        .load()
        .await;
    let second = client
        .use_fetch(Some("/products"), FetchOptions::default())
        .load()
        .await;

    assert_eq!(first.data, second.data);
    assert_eq!(backend.hits("GET", "/products"), 1);
}

#[tokio::test]
async fn test_refetch_goes_to_network() {
    let backend = MockBackend::start().await;
    let client = backend.client();
    let products = client.use_fetch(Some("/products"), FetchOptions::default());

    let _ = products.load().await;
    let _ = products.load().await;
    let refreshed = products.refetch().await;

    assert_eq!(refreshed.phase, FetchPhase::Success);

    assert_eq!(backend.hits("GET", "/products"), 2);
}

#[tokio::test]
async fn test_slow_superseded_page_does_not_win() {
    let backend = MockBackend::start().await;
    let client = backend.client();
    let products = client.use_fetch(
        Some("/products?page=1&delay_ms=300"),
        FetchOptions::default(),
    );

    let slow = products.spawn_load();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = products.set_url(Some("/products?page=2".to_string())).await;
    slow.await.expect("load task panicked");
    tokio::time::sleep(Duration::from_millis(350)).await;

    let page_of = |data: &Option<Value>| data.as_ref().map(|d| d[0]["page"].clone());
    assert_eq!(page_of(&fast.data), Some(json!(2)));
    assert_eq!(page_of(&products.state().data), Some(json!(2)));
    assert!(products.state().error.is_none());
}

#[tokio::test]
async fn test_unmount_never_errors() {
    let backend = MockBackend::start().await;
    let client = backend.client();
    let products = client.use_fetch(Some("/products?delay_ms=300"), FetchOptions::default());

    let task = products.spawn_load();
    tokio::time::sleep(Duration::from_millis(50)).await;
    products.unmount();

    let state = task.await.expect("load task panicked");
    assert_eq!(state.phase, FetchPhase::Cancelled);
    assert!(state.error.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn test_unauthorized_read_keeps_token() {
    let backend = MockBackend::start().await;
    let client = backend.client();
    let token = token_expiring_in(1);
    client.tokens().set_tokens(&token, Some("refresh"));

    let state = client
        .use_fetch(Some("/orders"), FetchOptions::authenticated())
        .load()
        .await;

    assert_eq!(state.error_message(), Some(messages::ACCESS_DENIED));
    assert_eq!(state.status, Some(401));
    assert_eq!(
        client.tokens().get_token().expect("token cleared").expose_secret(),
        token
    );
}

#[tokio::test]
async fn test_server_error_and_connection_failure() {
    let backend = MockBackend::start().await;
    let client = backend.client();

    let state = client
        .use_fetch(Some("/broken"), FetchOptions::default())
        .load()
        .await;
    assert!(matches!(state.error, Some(RequestError::Server { .. })));
    assert!(state.error_message().is_some_and(|m| m.contains("500")));

    let config = backend.config();
    drop(backend);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let offline = Shopfront::from_config(&config)
        .expect("Failed to build client")
        .use_fetch(Some("/products"), FetchOptions::default())
        .load()
        .await;
    assert!(matches!(offline.error, Some(RequestError::Network { .. })));
    assert!(
        offline
            .error_message()
            .is_some_and(|m| m.starts_with(messages::CONNECTION_FAILED))
    );
}
