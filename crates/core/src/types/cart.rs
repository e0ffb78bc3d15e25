//! Cart payloads.
//!
//! A cart is read as two documents: the line items (`GET /cart/items`) and
//! the server-computed totals (`GET /cart/summary`). [`CartSnapshot`] holds
//! both and is rebuilt from scratch on every refresh.

use serde::{Deserialize, Serialize};

use crate::types::id::{CartItemId, ProductId, VariantId};
use crate::types::price::Price;

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub item_id: CartItemId,
    pub variant_id: VariantId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub unit_price: Price,
    pub quantity: u32,
    /// Server-computed line total, when the backend sends one.
    #[serde(default)]
    pub line_total: Option<Price>,
}

impl CartItem {
    /// The line total, falling back to `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.line_total
            .unwrap_or_else(|| self.unit_price.times(self.quantity))
    }
}

/// Cart totals as computed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSummary {
    pub total_items: u32,
    pub subtotal: Price,
    pub discount: Price,
    pub shipping_fee: Price,
    pub total: Price,
}

/// Items plus summary, as held by the cart context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
}

impl CartSnapshot {
    /// An empty cart (anonymous visitor or after logout).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of units in the cart.
    ///
    /// Prefers the server's count and falls back to summing quantities when
    /// the summary has not been loaded.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        if self.summary.total_items > 0 {
            self.summary.total_items
        } else {
            self.items.iter().map(|item| item.quantity).sum()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line holding a given variant.
    #[must_use]
    pub fn find_variant(&self, variant_id: VariantId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.variant_id == variant_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_minimal_payload() {
        let item: CartItem = serde_json::from_str(
            r#"{"item_id":9,"variant_id":5,"quantity":2,"unit_price":"150000"}"#,
        )
        .unwrap();
        assert_eq!(item.item_id, CartItemId::new(9));
        assert_eq!(item.line_total(), Price::from_dong(300_000));
        assert!(item.product_name.is_empty());
    }

    #[test]
    fn test_line_total_prefers_server_value() {
        let item: CartItem = serde_json::from_str(
            r#"{"item_id":1,"variant_id":2,"quantity":3,"unit_price":100,"line_total":250}"#,
        )
        .unwrap();
        assert_eq!(item.line_total(), Price::from_dong(250));
    }

    #[test]
    fn test_item_count_falls_back_to_quantities() {
        let items: Vec<CartItem> = serde_json::from_value(serde_json::json!([
            { "item_id": 1, "variant_id": 2, "quantity": 3 },
            { "item_id": 2, "variant_id": 3, "quantity": 1 }
        ]))
        .unwrap();
        let mut snapshot = CartSnapshot {
            items,
            summary: CartSummary::default(),
        };
        assert_eq!(snapshot.item_count(), 4);

        snapshot.summary.total_items = 7;
        assert_eq!(snapshot.item_count(), 7);
        assert!(snapshot.find_variant(VariantId::new(3)).is_some());
    }

    #[test]
    fn test_summary_tolerates_missing_fields() {
        let summary: CartSummary = serde_json::from_str(r#"{"total":330000}"#).unwrap();
        assert_eq!(summary.total, Price::from_dong(330_000));
        assert_eq!(summary.shipping_fee, Price::ZERO);
    }
}
