//! Wishlist context: refetch on add, optimistic removal with rollback.

use serde_json::json;
use shopfront_client::Scope;
use shopfront_client::context::{WishlistProvider, use_wishlist};
use shopfront_core::ProductId;
use shopfront_integration_tests::{MockBackend, token_expiring_in};

fn seed(backend: &MockBackend) {
    backend.seed_wishlist(vec![
        json!({ "product_id": 1, "product_name": "Cà phê Buôn Ma Thuột", "price": "210000" }),
        json!({ "product_id": 2, "product_name": "Trà Thái Nguyên" }),
    ]);
}

#[tokio::test]
async fn test_add_then_remove() {
    let backend = MockBackend::start().await;
    seed(&backend);
    let client = backend.client();
    client.tokens().set_tokens(&token_expiring_in(1), None);

    let scope = WishlistProvider::mount(&Scope::root(), &client).await;
    let wishlist = use_wishlist(&scope).expect("wishlist provider missing");
    assert_eq!(wishlist.state().wishlist.items.len(), 2);

    let added = wishlist.add(ProductId::new(3)).await;
    assert!(added.success);
    assert!(wishlist.contains(ProductId::new(3)));
    assert_eq!(backend.hits("GET", "/wishlist"), 2);

    let removed = wishlist.remove(ProductId::new(1)).await;
    assert!(removed.success);
    assert!(!wishlist.contains(ProductId::new(1)));
    assert_eq!(backend.hits("DELETE", "/wishlist/1"), 1);
    assert_eq!(backend.hits("GET", "/wishlist"), 2);
}

#[tokio::test]
async fn test_failed_remove_rolls_back() {
    let backend = MockBackend::start().await;
    seed(&backend);
    backend.fail_wishlist_deletes(true);
    let client = backend.client();
    client.tokens().set_tokens(&token_expiring_in(1), None);

    let scope = WishlistProvider::mount(&Scope::root(), &client).await;
    let wishlist = use_wishlist(&scope).expect("wishlist provider missing");

    let outcome = wishlist.remove(ProductId::new(1)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(503));
    let state = wishlist.state();
    let ids: Vec<i64> = state
        .wishlist
        .items
        .iter()
        .map(|item| item.product_id.as_i64())
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(state.error.as_deref(), Some("Hệ thống đang bảo trì"));
}
