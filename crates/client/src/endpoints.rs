//! REST paths used by the domain contexts, relative to the API base URL.

use shopfront_core::{CartItemId, NotificationId, ProductId};

pub const CART: &str = "/cart";
pub const CART_ITEMS: &str = "/cart/items";
pub const CART_SUMMARY: &str = "/cart/summary";

pub const NOTIFICATIONS_UNREAD_COUNT: &str = "/notifications/unread-count";
pub const NOTIFICATIONS_READ_ALL: &str = "/notifications/read-all";

pub const WISHLIST: &str = "/wishlist";

#[must_use]
pub fn cart_item(id: CartItemId) -> String {
    format!("{CART_ITEMS}/{id}")
}

#[must_use]
pub fn notification(id: NotificationId) -> String {
    format!("/notifications/{id}")
}

#[must_use]
pub fn notification_read(id: NotificationId) -> String {
    format!("/notifications/{id}/read")
}

#[must_use]
pub fn wishlist_item(product_id: ProductId) -> String {
    format!("{WISHLIST}/{product_id}")
}
