//! Login and logout.
//!
//! Logout is the only path that clears stored credentials. It also drops
//! every cached response and resets whichever domain contexts are mounted
//! above the given scope, so nothing from the previous customer survives.

use shopfront_core::UserProfile;
use tracing::{info, instrument};

use crate::client::Shopfront;
use crate::context::{CartContext, NotificationContext, Scope, WishlistContext};
use crate::token::AuthState;

/// Session operations for one [`Shopfront`] client.
#[derive(Debug, Clone)]
pub struct Session {
    client: Shopfront,
}

impl Session {
    #[must_use]
    pub const fn new(client: Shopfront) -> Self {
        Self { client }
    }

    /// Store a fresh login and reload the mounted contexts.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        user: Option<&UserProfile>,
        scope: &Scope,
    ) {
        let tokens = self.client.tokens();
        tokens.set_tokens(access_token, refresh_token);
        if let Some(user) = user {
            tokens.set_user(user);
        }
        info!(state = ?tokens.auth_state(), "Logged in");

        let cart = scope.try_consume::<CartContext>();
        let notifications = scope.try_consume::<NotificationContext>();
        let wishlist = scope.try_consume::<WishlistContext>();

        tokio::join!(
            async {
                if let Some(cart) = &cart {
                    cart.refresh().await;
                }
            },
            async {
                if let Some(notifications) = &notifications {
                    notifications.refresh().await;
                }
            },
            async {
                if let Some(wishlist) = &wishlist {
                    wishlist.refresh().await;
                }
            },
        );
    }

    /// Forget the customer: credentials, cached responses and context state.
    #[instrument(skip_all)]
    pub fn logout(&self, scope: &Scope) {
        self.client.tokens().clear_tokens();
        self.client.cache().clear();

        if let Some(cart) = scope.try_consume::<CartContext>() {
            cart.reset();
        }
        if let Some(notifications) = scope.try_consume::<NotificationContext>() {
            notifications.reset();
        }
        if let Some(wishlist) = scope.try_consume::<WishlistContext>() {
            wishlist.reset();
        }

        info!("Logged out");
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.client.tokens().user()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().is_authenticated()
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.client.tokens().auth_state()
    }
}
