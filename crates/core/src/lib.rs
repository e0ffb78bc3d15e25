//! Shopfront Core - Shared domain types.
//!
//! This crate provides the types exchanged with the storefront REST backend:
//! - typed IDs for products, variants, cart items and notifications
//! - prices in Vietnamese dong
//! - cart, notification, wishlist and user profile payloads
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no caching.
//! The `shopfront-client` crate builds the data-fetching layer on top of it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices and domain payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
