//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use tableside_core::MenuItem;
use tableside_identity::IdentityProvider;
use tableside_store::{Collection, MemoryStore, collections};

use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// document store, the identity provider, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: MemoryStore,
    identity: IdentityProvider,
    menu_cache: Cache<&'static str, Arc<Vec<MenuItem>>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, store: MemoryStore, identity: IdentityProvider) -> Self {
        let menu_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(config.menu_cache_ttl_secs))
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                menu_cache,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    /// Get a reference to the identity provider.
    #[must_use]
    pub fn identity(&self) -> &IdentityProvider {
        &self.inner.identity
    }

    /// Get a reference to the menu read cache.
    #[must_use]
    pub fn menu_cache(&self) -> &Cache<&'static str, Arc<Vec<MenuItem>>> {
        &self.inner.menu_cache
    }

    /// The menu collection.
    #[must_use]
    pub fn menu(&self) -> Collection {
        self.inner.store.collection(collections::MENU)
    }

    /// The orders collection.
    #[must_use]
    pub fn orders(&self) -> Collection {
        self.inner.store.collection(collections::ORDERS)
    }

    /// The reviews collection.
    #[must_use]
    pub fn reviews(&self) -> Collection {
        self.inner.store.collection(collections::REVIEWS)
    }

    /// The user profile collection.
    #[must_use]
    pub fn users(&self) -> Collection {
        self.inner.store.collection(collections::USERS)
    }
}
