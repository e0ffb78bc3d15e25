//! Login, logout and persisted credentials.

use secrecy::ExposeSecret;
use shopfront_client::context::{
    CartProvider, NotificationProvider, WishlistProvider, use_cart, use_notifications,
    use_wishlist,
};
use shopfront_client::{AuthState, CacheKey, FetchOptions, Scope, Shopfront, TokenStore};
use shopfront_core::{UserId, UserProfile, VariantId};
use shopfront_integration_tests::{MockBackend, token_expiring_in};

fn profile() -> UserProfile {
    UserProfile {
        id: UserId::new(11),
        email: "minh@example.vn".to_string(),
        full_name: Some("Trần Văn Minh".to_string()),
        phone: Some("0901234567".to_string()),
        loyalty_points: 1200,
    }
}

#[tokio::test]
async fn test_login_loads_contexts_and_logout_clears_everything() {
    let backend = MockBackend::start().await;
    backend.set_unread(2);
    let client = backend.client();
    let session = client.session();

    let root = Scope::root();
    let scope = CartProvider::mount(&root, &client).await;
    let scope = NotificationProvider::mount(&scope, &client).await;
    let scope = WishlistProvider::mount(&scope, &client).await;
    assert_eq!(backend.total_hits(), 0);

    session
        .login(&token_expiring_in(1), Some("refresh-1"), Some(&profile()), &scope)
        .await;
    assert_eq!(session.auth_state(), AuthState::Active);
    assert_eq!(use_notifications(&scope).expect("provider").unread_count(), 2);

    let cart = use_cart(&scope).expect("provider");
    cart.add_item(VariantId::new(5), 1).await;
    assert_eq!(cart.item_count(), 1);

    let products = client
        .use_fetch(Some("/products"), FetchOptions::authenticated())
        .load()
        .await;
    assert!(products.is_fetched());
    assert!(
        client
            .cache()
            .get(&CacheKey::new("/products", true))
            .await
            .is_some()
    );

    session.logout(&scope);

    assert_eq!(session.auth_state(), AuthState::Anonymous);
    assert!(session.user().is_none());
    assert!(client.cache().get(&CacheKey::new("/products", true)).await.is_none());
    assert_eq!(cart.item_count(), 0);
    assert_eq!(use_notifications(&scope).expect("provider").unread_count(), 0);
    assert!(use_wishlist(&scope).expect("provider").state().wishlist.items.is_empty());
}

#[tokio::test]
async fn test_expired_token_is_not_authenticated() {
    let backend = MockBackend::start().await;
    let client = backend.client();
    let expired = token_expiring_in(-1);
    client.tokens().set_tokens(&expired, None);

    assert!(TokenStore::is_expired(&expired));
    assert!(!client.tokens().is_authenticated());
    assert_eq!(client.tokens().auth_state(), AuthState::Expired);
    let claims = TokenStore::decode(&expired).expect("token should decode");
    assert!(claims.expires_at().is_some_and(|at| at < chrono::Utc::now()));
}

#[tokio::test]
async fn test_credentials_survive_restart_with_file_storage() {
    let backend = MockBackend::start().await;
    let path = std::env::temp_dir().join(format!(
        "shopfront-session-{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let mut config = backend.config();
    config.storage_path = Some(path.clone());
    let token = token_expiring_in(1);

    {
        let client = Shopfront::from_config(&config).expect("Failed to build client");
        client
            .session()
            .login(&token, None, Some(&profile()), &Scope::root())
            .await;
    }

    let restarted = Shopfront::from_config(&config).expect("Failed to build client");
    assert!(restarted.tokens().is_authenticated());
    assert_eq!(
        restarted.tokens().get_token().expect("token lost").expose_secret(),
        token
    );
    assert_eq!(restarted.session().user().map(|u| u.loyalty_points), Some(1200));

    restarted.session().logout(&Scope::root());
    let after_logout = Shopfront::from_config(&config).expect("Failed to build client");
    assert_eq!(after_logout.tokens().auth_state(), AuthState::Anonymous);

    let _ = std::fs::remove_file(&path);
}
