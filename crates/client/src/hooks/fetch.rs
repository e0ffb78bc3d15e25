//! Fetch hook: cached, cancellable reads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::AbortHandle;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::cache::{CacheKey, ResponseCache};
use crate::error::RequestError;
use crate::executor::{Executor, RequestResult, RequestSpec};

/// Where a fetch hook is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPhase {
    /// Nothing loaded yet.
    #[default]
    Idle,
    Loading,
    Success,
    Error,
    /// The owner went away or unmounted mid-request.
    Cancelled,
}

/// Snapshot published by a [`FetchHook`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<RequestError>,
    /// Status of the last response applied; `None` for cache hits.
    pub status: Option<u16>,
    pub phase: FetchPhase,
}

impl FetchState {
    /// True once any data has been loaded.
    #[must_use]
    pub const fn is_fetched(&self) -> bool {
        self.data.is_some()
    }

    /// Decode the loaded data into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the decode error if the data does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data
            .as_ref()
            .map(|data| T::deserialize(data))
            .transpose()
    }

    /// The error message, if the last load failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(RequestError::message)
    }
}

/// Per-hook read options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Attach the stored bearer token.
    pub auth: bool,
    /// Always go to the network and never populate the cache.
    pub skip_cache: bool,
}

impl FetchOptions {
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            auth: true,
            skip_cache: false,
        }
    }

    #[must_use]
    pub const fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }
}

// =============================================================================
// FetchHook
// =============================================================================

/// A reactive read of one URL.
///
/// Dropping the hook aborts whatever request it still has in flight.
pub struct FetchHook {
    inner: Arc<FetchInner>,
}

struct FetchInner {
    executor: Executor,
    cache: ResponseCache,
    options: FetchOptions,
    url: Mutex<Option<String>>,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
    state: watch::Sender<FetchState>,
}

/// The one request this hook currently considers live.
struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

impl FetchHook {
    /// Create a hook. Nothing is requested until [`load`](Self::load).
    ///
    /// A `None` URL leaves the hook idle.
    #[must_use]
    pub fn new(
        executor: Executor,
        cache: ResponseCache,
        url: Option<String>,
        options: FetchOptions,
    ) -> Self {
        Self {
            inner: Arc::new(FetchInner {
                executor,
                cache,
                options,
                url: Mutex::new(url),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                state: watch::Sender::new(FetchState::default()),
            }),
        }
    }

    /// Load the current URL, serving from cache when possible.
    #[must_use]
    pub async fn load(&self) -> FetchState {
        self.inner.load(false).await
    }

    /// Load the current URL, bypassing and then overwriting the cache entry.
    #[must_use]
    pub async fn refetch(&self) -> FetchState {
        self.inner.load(true).await
    }

    /// Switch to another URL (or to none) and load it.
    #[must_use]
    pub async fn set_url(&self, url: Option<String>) -> FetchState {
        *self.inner.url.lock().unwrap_or_else(PoisonError::into_inner) = url;
        self.inner.load(false).await
    }

    /// Run [`load`](Self::load) on a background task.
    pub fn spawn_load(&self) -> JoinHandle<FetchState> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.load(false).await })
    }

    /// Run [`refetch`](Self::refetch) on a background task.
    pub fn spawn_refetch(&self) -> JoinHandle<FetchState> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.load(true).await })
    }

    /// Abort the in-flight request, if any. Never publishes an error.
    pub fn unmount(&self) {
        self.inner.cancel();
    }

    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.inner.url.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn state(&self) -> FetchState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.inner.state.subscribe()
    }
}

impl Drop for FetchHook {
    fn drop(&mut self) {
        self.inner.cancel();
    }
}

impl FetchInner {
    #[instrument(skip(self), fields(url = tracing::field::Empty, auth = self.options.auth))]
    async fn load(&self, force: bool) -> FetchState {
        let url = self.url.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(url) = url else {
            self.cancel();
            return self.state.borrow().clone();
        };
        tracing::Span::current().record("url", url.as_str());

        let key = CacheKey::new(url.as_str(), self.options.auth);
        let bypass = force || self.options.skip_cache;

        if bypass {
            self.cache.delete(&key).await;
        } else if let Some(cached) = self.cache.get(&key).await {
            debug!(key = %key, "Cache hit");
            self.supersede();
            self.state.send_modify(|state| {
                state.data = Some(cached);
                state.loading = false;
                state.error = None;
                state.status = None;
                state.phase = FetchPhase::Success;
            });
            return self.state.borrow().clone();
        } else {
            debug!(key = %key, "Cache miss");
        }

        let (abort, registration) = AbortHandle::new_pair();
        let generation = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = in_flight.take() {
                debug!(generation = previous.generation, "Aborting superseded request");
                previous.abort.abort();
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *in_flight = Some(InFlight { generation, abort });
            generation
        };

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            state.phase = FetchPhase::Loading;
        });

        let spec = RequestSpec::get(url.as_str()).with_auth(self.options.auth);
        let result = self.executor.execute_abortable(spec, registration).await;

        if !self.finish(generation) {
            debug!(generation, "Discarding result of superseded request");
            return self.state.borrow().clone();
        }

        match result {
            RequestResult::Success { data, status } => {
                // No await between `finish` and publishing.
                let cached = data.clone().filter(|_| !self.options.skip_cache);
                self.state.send_modify(|state| {
                    state.data = data;
                    state.loading = false;
                    state.error = None;
                    state.status = Some(status.as_u16());
                    state.phase = FetchPhase::Success;
                });
                if let Some(value) = cached
                    && self.generation.load(Ordering::SeqCst) == generation
                {
                    self.cache.set(key, value).await;
                }
            }
            RequestResult::Failure(error) => {
                self.state.send_modify(|state| {
                    if error.is_unauthorized() {
                        state.data = None;
                    }
                    state.loading = false;
                    state.status = error.status().map(|s| s.as_u16());
                    state.error = Some(error);
                    state.phase = FetchPhase::Error;
                });
            }
            RequestResult::Cancelled => {
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.phase = FetchPhase::Cancelled;
                });
            }
        }

        self.state.borrow().clone()
    }

    /// Clear the in-flight slot if it still belongs to `generation`.
    ///
    /// Returns false when a newer request has been issued since.
    fn finish(&self, generation: u64) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.generation.load(Ordering::SeqCst) == generation;
        if current && in_flight.as_ref().is_some_and(|f| f.generation == generation) {
            *in_flight = None;
        }
        drop(in_flight);
        current
    }

    /// Invalidate any in-flight request without touching published state.
    ///
    /// Returns true if a request was aborted.
    fn supersede(&self) -> bool {
        let previous = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            self.generation.fetch_add(1, Ordering::SeqCst);
            in_flight.take()
        };
        previous.map(|previous| previous.abort.abort()).is_some()
    }

    fn cancel(&self) {
        if self.supersede() {
            debug!("Cancelled in-flight request");
            self.state.send_modify(|state| {
                state.loading = false;
                state.phase = FetchPhase::Cancelled;
            });
        }
    }
}
