//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the storefront's domain
//! concepts and the payloads the REST backend returns for them.

pub mod cart;
pub mod id;
pub mod notification;
pub mod price;
pub mod user;
pub mod wishlist;

pub use cart::{CartItem, CartSnapshot, CartSummary};
pub use id::*;
pub use notification::UnreadCount;
pub use price::Price;
pub use user::UserProfile;
pub use wishlist::{WishlistItem, WishlistSnapshot};
