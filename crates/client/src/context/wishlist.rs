//! Wishlist context.
//!
//! Unlike the cart, removal is optimistic: the item disappears locally before
//! the backend confirms, and comes back in its old position if the write fails.

use std::sync::Arc;

use serde_json::json;
use shopfront_core::{ProductId, WishlistItem, WishlistSnapshot};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::client::Shopfront;
use crate::context::{ContextError, Scope, decode_list};
use crate::endpoints;
use crate::hooks::{FetchHook, FetchOptions, MutationHook, MutationOutcome};
use crate::messages;
use crate::token::TokenStore;

/// State published by the wishlist context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistState {
    pub wishlist: WishlistSnapshot,
    pub loading: bool,
    pub error: Option<String>,
}

/// Mounts a [`WishlistContext`] into a scope.
pub struct WishlistProvider;

impl WishlistProvider {
    pub async fn mount(parent: &Scope, client: &Shopfront) -> Scope {
        let scope = parent.child();
        let wishlist = WishlistContext::new(client);
        scope.provide(wishlist.clone());
        wishlist.refresh().await;
        scope
    }
}

/// The nearest wishlist context.
///
/// # Errors
///
/// Returns `ContextError::MissingProvider` outside a [`WishlistProvider`]
/// subtree.
pub fn use_wishlist(scope: &Scope) -> Result<WishlistContext, ContextError> {
    scope.consume::<WishlistContext>()
}

#[derive(Clone)]
pub struct WishlistContext {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    tokens: TokenStore,
    items: FetchHook,
    mutation: MutationHook,
    state: watch::Sender<WishlistState>,
}

impl std::fmt::Debug for WishlistContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistContext")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl WishlistContext {
    #[must_use]
    pub fn new(client: &Shopfront) -> Self {
        Self {
            inner: Arc::new(WishlistInner {
                tokens: client.tokens().clone(),
                items: client.use_fetch(
                    Some(endpoints::WISHLIST),
                    FetchOptions::authenticated().skip_cache(),
                ),
                mutation: client.use_mutation(),
                state: watch::Sender::new(WishlistState::default()),
            }),
        }
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> WishlistState {
        let inner = &self.inner;

        if !inner.tokens.is_authenticated() {
            debug!("Not logged in; wishlist is empty");
            inner.items.unmount();
            inner.state.send_replace(WishlistState::default());
            return self.state();
        }

        inner.state.send_modify(|state| state.loading = true);
        let fetched = inner.items.refetch().await;

        inner.state.send_modify(|state| {
            state.loading = false;
            if let Some(message) = fetched.error_message() {
                state.error = Some(message.to_string());
                return;
            }
            let decoded = fetched
                .data
                .as_ref()
                .map(decode_list::<WishlistItem>)
                .transpose();
            match decoded {
                Ok(items) => {
                    state.wishlist.items = items.unwrap_or_default();
                    state.error = None;
                }
                Err(e) => state.error = Some(messages::invalid_response(&e.to_string())),
            }
        });

        self.state()
    }

    /// Save a product, then re-read the wishlist.
    pub async fn add(&self, product_id: ProductId) -> MutationOutcome {
        let outcome = self
            .inner
            .mutation
            .post(endpoints::WISHLIST, json!({ "product_id": product_id }))
            .await;

        self.refresh().await;
        if let Some(message) = outcome.error_message() {
            let message = message.to_string();
            self.inner.state.send_modify(|state| state.error = Some(message));
        }
        outcome
    }

    /// Remove a product optimistically.
    ///
    /// The item is dropped from the published state before the request goes
    /// out. On failure it is put back where it was and the error is published.
    pub async fn remove(&self, product_id: ProductId) -> MutationOutcome {
        let mut taken = None;
        self.inner.state.send_modify(|state| {
            taken = state.wishlist.take(product_id);
            state.error = None;
        });

        let outcome = self
            .inner
            .mutation
            .delete(&endpoints::wishlist_item(product_id))
            .await;

        if !outcome.success {
            warn!(
                product_id = %product_id,
                status = ?outcome.status,
                "Wishlist removal failed; restoring item"
            );
            let message = outcome.error_message().map(str::to_string);
            self.inner.state.send_modify(|state| {
                if let Some((index, item)) = taken
                    && !state.wishlist.contains(product_id)
                {
                    state.wishlist.restore(index, item);
                }
                state.error = message;
            });
        }

        outcome
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.inner.state.borrow().wishlist.contains(product_id)
    }

    pub fn reset(&self) {
        self.inner.items.unmount();
        self.inner.mutation.reset();
        self.inner.state.send_replace(WishlistState::default());
    }

    #[must_use]
    pub fn state(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }
}
