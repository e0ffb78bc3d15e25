//! Response cache shared by every fetch hook.
//!
//! Stale-until-invalidated: entries never expire and there is no size bound.
//! An entry is only replaced by a forced refetch or removed when a caller
//! bypasses the cache for its key (or on logout, which clears everything).

use std::fmt;

use moka::future::Cache;
use serde_json::Value;

/// Cache key: request URL plus whether the read was authenticated.
///
/// The same URL read with and without credentials lands in different slots,
/// so an anonymous product listing never serves a customer-specific one.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    url: String,
    auth: bool,
}

impl CacheKey {
    #[must_use]
    pub fn new(url: impl Into<String>, auth: bool) -> Self {
        Self {
            url: url.into(),
            auth,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn auth(&self) -> bool {
        self.auth
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.auth { "auth" } else { "anon" };
        write!(f, "{}#{scope}", self.url)
    }
}

/// Process-wide key to JSON value map.
///
/// Cloning is cheap; clones share the same entries. Concurrent writers to one
/// key race and the last completed write wins.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<CacheKey, Value>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Create an empty, unbounded cache with no expiry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.get(key).await
    }

    pub async fn set(&self, key: CacheKey, value: Value) {
        self.entries.insert(key, value).await;
    }

    /// Remove an entry, returning what it held.
    pub async fn delete(&self, key: &CacheKey) -> Option<Value> {
        self.entries.remove(key).await
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of live entries.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
