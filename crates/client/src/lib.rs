//! Shopfront client library.
//!
//! The data layer of the storefront: credentials in a [`TokenStore`], one
//! request at a time through the [`Executor`], reads cached in a shared
//! [`ResponseCache`], and the cart, notification and wishlist contexts built
//! on top of the fetch and mutation hooks.
//!
//! # Example
//!
//! ```rust,no_run
//! use shopfront_client::{FetchOptions, Shopfront};
//!
//! # async fn run() -> Result<(), shopfront_client::ClientError> {
//! let client = Shopfront::from_env()?;
//! let products = client.use_fetch(Some("/products"), FetchOptions::default());
//! let state = products.load().await;
//! if let Some(message) = state.error_message() {
//!     eprintln!("{message}");
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod http;
pub mod messages;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod token;

pub use cache::{CacheKey, ResponseCache};
pub use client::Shopfront;
pub use config::{ClientConfig, ConfigError};
pub use context::{ContextError, Scope};
pub use error::{ClientError, RequestError};
pub use executor::{Executor, RequestResult, RequestSpec};
pub use hooks::{
    FetchHook, FetchOptions, FetchPhase, FetchState, MutateOptions, MutationHook, MutationOutcome,
};
pub use session::Session;
pub use token::{AuthState, TokenStore};
