//! Cart context.
//!
//! The cart is always re-read from the backend after a write. There is no
//! local patching: every add, update, remove or clear is followed by a full
//! refetch of items and summary.

use std::sync::Arc;

use serde_json::json;
use shopfront_core::{CartItem, CartItemId, CartSnapshot, CartSummary, VariantId};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::client::Shopfront;
use crate::context::{ContextError, Scope, decode_list};
use crate::endpoints;
use crate::hooks::{FetchHook, FetchOptions, FetchState, MutationHook, MutationOutcome};
use crate::messages;
use crate::token::TokenStore;

/// State published by the cart context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub cart: CartSnapshot,
    pub loading: bool,
    pub error: Option<String>,
}

/// Mounts a [`CartContext`] into a scope.
pub struct CartProvider;

impl CartProvider {
    /// Create a child scope carrying a cart context and load the cart.
    pub async fn mount(parent: &Scope, client: &Shopfront) -> Scope {
        let scope = parent.child();
        let cart = CartContext::new(client);
        scope.provide(cart.clone());
        cart.refresh().await;
        scope
    }
}

/// The nearest cart context.
///
/// # Errors
///
/// Returns `ContextError::MissingProvider` outside a [`CartProvider`] subtree.
pub fn use_cart(scope: &Scope) -> Result<CartContext, ContextError> {
    scope.consume::<CartContext>()
}

/// Shared cart state and the operations that change it.
#[derive(Clone)]
pub struct CartContext {
    inner: Arc<CartInner>,
}

struct CartInner {
    tokens: TokenStore,
    items: FetchHook,
    summary: FetchHook,
    mutation: MutationHook,
    state: watch::Sender<CartState>,
}

impl std::fmt::Debug for CartContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartContext")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CartContext {
    #[must_use]
    pub fn new(client: &Shopfront) -> Self {
        let options = FetchOptions::authenticated().skip_cache();
        Self {
            inner: Arc::new(CartInner {
                tokens: client.tokens().clone(),
                items: client.use_fetch(Some(endpoints::CART_ITEMS), options),
                summary: client.use_fetch(Some(endpoints::CART_SUMMARY), options),
                mutation: client.use_mutation(),
                state: watch::Sender::new(CartState::default()),
            }),
        }
    }

    /// Re-read items and summary.
    ///
    /// Without a valid login the cart is empty and nothing is requested.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> CartState {
        let inner = &self.inner;

        if !inner.tokens.is_authenticated() {
            debug!("Not logged in; using empty cart");
            inner.items.unmount();
            inner.summary.unmount();
            inner.state.send_replace(CartState::default());
            return self.state();
        }

        inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let (items, summary) = tokio::join!(inner.items.refetch(), inner.summary.refetch());

        inner.state.send_modify(|state| {
            state.loading = false;
            match decode_items(&items) {
                Ok(Some(list)) => state.cart.items = list,
                Ok(None) => state.cart.items.clear(),
                Err(message) => state.error = Some(message),
            }
            match decode_summary(&summary) {
                Ok(value) => state.cart.summary = value.unwrap_or_default(),
                Err(message) => {
                    if state.error.is_none() {
                        state.error = Some(message);
                    }
                }
            }
        });

        self.state()
    }

    /// Add a variant to the cart.
    pub async fn add_item(&self, variant_id: VariantId, quantity: u32) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .post(
                endpoints::CART_ITEMS,
                json!({ "variant_id": variant_id, "quantity": quantity }),
            )
            .await;
        self.after_write(outcome).await
    }

    /// Change the quantity of a cart line.
    pub async fn update_item(&self, item_id: CartItemId, quantity: u32) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .put(&endpoints::cart_item(item_id), json!({ "quantity": quantity }))
            .await;
        self.after_write(outcome).await
    }

    /// Remove a cart line.
    pub async fn remove_item(&self, item_id: CartItemId) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .delete(&endpoints::cart_item(item_id))
            .await;
        self.after_write(outcome).await
    }

    /// Empty the cart.
    pub async fn clear(&self) -> MutationOutcome {
        let outcome = self.inner.mutation.delete(endpoints::CART).await;
        self.after_write(outcome).await
    }

    /// Drop the snapshot and abort pending reads.
    pub fn reset(&self) {
        self.inner.items.unmount();
        self.inner.summary.unmount();
        self.inner.mutation.reset();
        self.inner.state.send_replace(CartState::default());
    }

    /// Total quantity in the cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.state.borrow().cart.item_count()
    }

    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    async fn after_write(&self, outcome: MutationOutcome) -> MutationOutcome {
        if !outcome.success {
            warn!(status = ?outcome.status, "Cart write failed");
        }

        self.refresh().await;

        if let Some(message) = outcome.error_message() {
            let message = message.to_string();
            self.inner.state.send_modify(|state| state.error = Some(message));
        }
        outcome
    }
}

fn decode_items(state: &FetchState) -> Result<Option<Vec<CartItem>>, String> {
    if let Some(message) = state.error_message() {
        return Err(message.to_string());
    }
    state
        .data
        .as_ref()
        .map(decode_list::<CartItem>)
        .transpose()
        .map_err(|e| messages::invalid_response(&e.to_string()))
}

fn decode_summary(state: &FetchState) -> Result<Option<CartSummary>, String> {
    if let Some(message) = state.error_message() {
        return Err(message.to_string());
    }
    state
        .decode::<CartSummary>()
        .map_err(|e| messages::invalid_response(&e.to_string()))
}
