//! The client handle that ties the data layer together.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::cache::ResponseCache;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::executor::Executor;
use crate::hooks::{FetchHook, FetchOptions, MutationHook};
use crate::http::{ReqwestTransport, Transport};
use crate::session::Session;
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::token::TokenStore;

/// Storefront data layer: one executor, one response cache, one token store.
///
/// Every hook created from the same `Shopfront` (or any clone of it) shares
/// the cache and credentials. Cloning is cheap.
#[derive(Clone)]
pub struct Shopfront {
    inner: Arc<ShopfrontInner>,
}

struct ShopfrontInner {
    executor: Executor,
    cache: ResponseCache,
    tokens: TokenStore,
}

impl std::fmt::Debug for Shopfront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shopfront")
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

impl Shopfront {
    /// Load configuration from the environment and build a client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if configuration, storage or transport setup fails.
    pub fn from_env() -> Result<Self, ClientError> {
        let config = ClientConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Build a client over `reqwest`, with file-backed credentials when a
    /// storage path is configured.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the storage file cannot be read or the HTTP
    /// client cannot be built.
    #[instrument(skip(config), fields(base_url = %config.api_base_url))]
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(config)?;

        let storage: Arc<dyn Storage> = match &config.storage_path {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => Arc::new(MemoryStorage::new()),
        };

        info!(
            persistent = config.storage_path.is_some(),
            "Storefront client initialized"
        );

        Ok(Self::with_transport(
            config.api_base_url.as_str(),
            Arc::new(transport),
            storage,
        ))
    }

    /// Build a client from its parts.
    #[must_use]
    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let tokens = TokenStore::new(storage);
        let executor = Executor::new(transport, tokens.clone(), base_url);

        Self {
            inner: Arc::new(ShopfrontInner {
                executor,
                cache: ResponseCache::new(),
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// A read hook over the shared cache. `None` leaves it idle.
    #[must_use]
    pub fn use_fetch(&self, url: Option<&str>, options: FetchOptions) -> FetchHook {
        FetchHook::new(
            self.inner.executor.clone(),
            self.inner.cache.clone(),
            url.map(str::to_string),
            options,
        )
    }

    /// A write hook.
    #[must_use]
    pub fn use_mutation(&self) -> MutationHook {
        MutationHook::new(self.inner.executor.clone())
    }

    /// Login and logout for this client.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }
}
