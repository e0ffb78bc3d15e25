//! Wishlist payloads.

use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::price::Price;

/// A product saved to the customer's wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// The wishlist as held by the wishlist context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WishlistSnapshot {
    pub items: Vec<WishlistItem>,
}

impl WishlistSnapshot {
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }

    /// Remove a product, returning the removed item and its position so the
    /// removal can be rolled back.
    pub fn take(&mut self, product_id: ProductId) -> Option<(usize, WishlistItem)> {
        let index = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)?;
        Some((index, self.items.remove(index)))
    }

    /// Put back an item previously removed with [`take`](Self::take).
    pub fn restore(&mut self, index: usize, item: WishlistItem) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }
}
