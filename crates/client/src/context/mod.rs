//! Domain contexts and the provider scope they live in.
//!
//! A [`Scope`] stands in for a subtree of the UI: providers mount a child
//! scope carrying their context, and consumers look contexts up by type,
//! walking towards the root. Looking up a context whose provider is not an
//! ancestor is an error, never a silent default.

mod cart;
mod notifications;
mod wishlist;

pub use cart::{CartContext, CartProvider, CartState, use_cart};
pub use notifications::{
    NotificationContext, NotificationProvider, NotificationState, use_notifications,
};
pub use wishlist::{WishlistContext, WishlistProvider, WishlistState, use_wishlist};

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors from context lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("{context} must be used within its provider")]
    MissingProvider { context: &'static str },
}

/// One node of the provider tree.
///
/// Cloning is cheap and yields a handle to the same node.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Arc<ScopeNode>,
}

#[derive(Default)]
struct ScopeNode {
    parent: Option<Scope>,
    values: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provided = self
            .inner
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("Scope")
            .field("provided", &provided)
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl Scope {
    /// A scope with no parent and nothing provided.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// A new scope nested under this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(ScopeNode {
                parent: Some(self.clone()),
                values: RwLock::default(),
            }),
        }
    }

    /// Make `value` available to this scope and its descendants.
    ///
    /// Providing the same type twice on one scope replaces the first value.
    pub fn provide<T>(&self, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Find the nearest provided `T`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingProvider` if no ancestor provides `T`.
    pub fn consume<T>(&self) -> Result<T, ContextError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.try_consume().ok_or(ContextError::MissingProvider {
            context: short_type_name::<T>(),
        })
    }

    /// Find the nearest provided `T`, if any.
    #[must_use]
    pub fn try_consume<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let found = current
                .inner
                .values
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&TypeId::of::<T>())
                .and_then(|value| value.downcast_ref::<T>())
                .cloned();
            if found.is_some() {
                return found;
            }
            scope = current.inner.parent.as_ref();
        }
        None
    }
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Decode a list payload that is either a bare array or `{"items": [...]}`.
pub(crate) fn decode_list<T: DeserializeOwned>(value: &Value) -> Result<Vec<T>, serde_json::Error> {
    match value.get("items") {
        Some(items) if value.is_object() => Vec::<T>::deserialize(items),
        _ => Vec::<T>::deserialize(value),
    }
}
