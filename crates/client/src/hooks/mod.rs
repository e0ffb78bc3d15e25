//! Read and write hooks.
//!
//! A [`FetchHook`] owns one reactive read of one URL at a time, backed by the
//! shared [`ResponseCache`](crate::cache::ResponseCache). A [`MutationHook`]
//! issues writes and never touches the cache. Both publish their state through
//! `tokio::sync::watch` so any number of observers can follow along.

mod fetch;
mod mutation;

pub use fetch::{FetchHook, FetchOptions, FetchPhase, FetchState};
pub use mutation::{MutateOptions, MutationHook, MutationOutcome, MutationState};
