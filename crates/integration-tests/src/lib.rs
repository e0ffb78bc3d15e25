//! End-to-end tests for the Shopfront client.
//!
//! Every test starts its own [`MockBackend`]: an axum server on an ephemeral
//! `127.0.0.1` port that speaks the storefront REST API closely enough for
//! the client's hooks and contexts to run against it over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Mock API (under `/api/v1`)
//!
//! - `GET /products[?page=N&delay_ms=N]` - public product listing
//! - `GET /orders` - always `401`
//! - `GET /broken` - always `500` with an HTML body
//! - `/cart/items`, `/cart/items/{id}`, `/cart/summary`, `/cart`
//! - `/notifications/unread-count`, `/notifications/{id}/read`,
//!   `/notifications/read-all`, `/notifications/{id}`
//! - `/wishlist`, `/wishlist/{product_id}`
//!
//! Cart, notification and wishlist routes answer `401` without a bearer token.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::{Value, json};
use shopfront_client::{ClientConfig, Shopfront};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// API prefix the mock serves under.
pub const API_PREFIX: &str = "/api/v1";

/// Build an unsigned JWT that expires `hours` from now (negative for past).
#[must_use]
pub fn token_expiring_in(hours: i64) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(hours)).timestamp();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "11", "exp": exp }).to_string());
    format!("{header}.{payload}.signature")
}

/// Install a test subscriber once, in the configured log format; later calls
/// are no-ops.
pub fn init_tracing(config: &ClientConfig) {
    let _ = shopfront_client::telemetry::init_from_config(config, "shopfront_client=debug");
}

// =============================================================================
// MockBackend
// =============================================================================

/// A running mock storefront backend.
///
/// The server task is aborted when the backend is dropped.
pub struct MockBackend {
    addr: std::net::SocketAddr,
    state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct BackendState {
    hits: Mutex<HashMap<String, usize>>,
    cart: Mutex<Vec<Value>>,
    next_item_id: AtomicI64,
    unread: AtomicU64,
    wishlist: Mutex<Vec<Value>>,
    fail_wishlist_delete: AtomicBool,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState {
            next_item_id: AtomicI64::new(9),
            ..BackendState::default()
        });

        let api = Router::new()
            .route("/products", get(list_products))
            .route("/orders", get(unauthorized))
            .route("/broken", get(broken))
            .route("/cart", delete(clear_cart))
            .route("/cart/items", get(list_cart_items).post(add_cart_item))
            .route(
                "/cart/items/{item_id}",
                axum::routing::put(update_cart_item).delete(remove_cart_item),
            )
            .route("/cart/summary", get(cart_summary))
            .route("/notifications/unread-count", get(unread_count))
            .route("/notifications/read-all", patch(mark_all_read))
            .route("/notifications/{id}/read", patch(mark_read))
            .route("/notifications/{id}", delete(delete_notification))
            .route("/wishlist", get(list_wishlist).post(add_wishlist))
            .route("/wishlist/{product_id}", delete(remove_wishlist));

        let app = Router::new()
            .nest(API_PREFIX, api)
            .layer(middleware::from_fn_with_state(Arc::clone(&state), count_hits))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        tracing::debug!(%addr, "Mock backend listening");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL including the API prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}{API_PREFIX}", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// `SHOPFRONT_LOG_FORMAT` is taken from the test environment; every other
    /// setting keeps its default.
    ///
    /// # Panics
    ///
    /// Panics if the base URL or the log format is invalid.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let base_url = self.base_url();
        ClientConfig::from_lookup(|key| match key {
            "SHOPFRONT_API_BASE_URL" => Some(base_url.clone()),
            "SHOPFRONT_LOG_FORMAT" => std::env::var(key).ok(),
            _ => None,
        })
        .expect("Invalid mock backend configuration")
    }

    /// A client over real HTTP with in-memory credentials.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> Shopfront {
        Shopfront::from_config(&self.config()).expect("Failed to build client")
    }

    /// How many times `METHOD /path` was requested (path without prefix or query).
    #[must_use]
    pub fn hits(&self, method: &str, path: &str) -> usize {
        let key = format!("{method} {API_PREFIX}{path}");
        self.state
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    /// Total requests received.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.state
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn set_unread(&self, count: u64) {
        self.state.unread.store(count, Ordering::SeqCst);
    }

    pub fn seed_wishlist(&self, items: Vec<Value>) {
        *self
            .state
            .wishlist
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = items;
    }

    pub fn fail_wishlist_deletes(&self, fail: bool) {
        self.state.fail_wishlist_delete.store(fail, Ordering::SeqCst);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Middleware & helpers
// =============================================================================

type AppState = Arc<BackendState>;

async fn count_hits(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = format!("{} {}", request.method(), request.uri().path());
    *state
        .hits
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(0) += 1;
    next.run(request).await
}

fn require_bearer(headers: &HeaderMap) -> Result<(), Response> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer ") && value.len() > "Bearer ".len());
    if authorized {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Not authenticated" })),
        )
            .into_response())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProductQuery {
    page: Option<u32>,
    delay_ms: Option<u64>,
}

async fn list_products(Query(query): Query<ProductQuery>) -> Json<Value> {
    if let Some(delay) = query.delay_ms {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let page = query.page.unwrap_or(1);
    let first = i64::from(page) * 10;
    Json(json!([
        { "id": first + 1, "name": "Áo dài lụa", "price": "1250000", "page": page },
        { "id": first + 2, "name": "Nón lá", "price": "85000", "page": page }
    ]))
}

async fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Token has been revoked" })),
    )
        .into_response()
}

async fn broken() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "<html><body>Internal Server Error</body></html>",
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct AddCartItem {
    variant_id: i64,
    quantity: i64,
}

async fn list_cart_items(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    Json(Value::Array(lock(&state.cart).clone())).into_response()
}

async fn add_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AddCartItem>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    if body.quantity <= 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "detail": [{ "loc": ["body", "quantity"], "msg": "must be positive" }]
            })),
        )
            .into_response();
    }

    let item_id = state.next_item_id.fetch_add(1, Ordering::SeqCst);
    lock(&state.cart).push(json!({
        "item_id": item_id,
        "variant_id": body.variant_id,
        "product_name": "Áo dài lụa",
        "unit_price": "1250000",
        "quantity": body.quantity,
    }));
    (StatusCode::CREATED, Json(json!({ "item_id": item_id }))).into_response()
}

#[derive(Debug, Deserialize)]
struct UpdateCartItem {
    quantity: i64,
}

async fn update_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<i64>,
    Json(body): Json<UpdateCartItem>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    let mut cart = lock(&state.cart);
    let Some(line) = cart.iter_mut().find(|line| line["item_id"] == item_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Không tìm thấy sản phẩm trong giỏ hàng" })),
        )
            .into_response();
    };
    line["quantity"] = json!(body.quantity);
    Json(line.clone()).into_response()
}

async fn remove_cart_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<i64>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    lock(&state.cart).retain(|line| line["item_id"] != item_id);
    StatusCode::NO_CONTENT.into_response()
}

async fn clear_cart(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    lock(&state.cart).clear();
    StatusCode::NO_CONTENT.into_response()
}

async fn cart_summary(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    let cart = lock(&state.cart);
    let total_items: i64 = cart.iter().filter_map(|line| line["quantity"].as_i64()).sum();
    let subtotal = total_items * 1_250_000;
    Json(json!({
        "total_items": total_items,
        "subtotal": subtotal.to_string(),
        "discount": "0",
        "shipping_fee": "0",
        "total": subtotal.to_string(),
    }))
    .into_response()
}

async fn unread_count(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    Json(json!({ "unread_count": state.unread.load(Ordering::SeqCst) })).into_response()
}

async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    let _ = state
        .unread
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    Json(json!({ "is_read": true })).into_response()
}

async fn mark_all_read(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    state.unread.store(0, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    let _ = state
        .unread
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Debug, Deserialize)]
struct AddWishlist {
    product_id: i64,
}

async fn list_wishlist(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    Json(json!({ "items": lock(&state.wishlist).clone() })).into_response()
}

async fn add_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AddWishlist>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    let item = json!({
        "product_id": body.product_id,
        "product_name": format!("Sản phẩm {}", body.product_id),
    });
    lock(&state.wishlist).push(item.clone());
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn remove_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Response {
    if let Err(rejection) = require_bearer(&headers) {
        return rejection;
    }
    if state.fail_wishlist_delete.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Hệ thống đang bảo trì" })),
        )
            .into_response();
    }
    lock(&state.wishlist).retain(|item| item["product_id"] != product_id);
    StatusCode::NO_CONTENT.into_response()
}
