//! Persisted client-side snapshot.
//!
//! The session snapshot lives in a small key/value storage under fixed
//! well-known keys, so the UI can resume instantly without contacting the
//! network. The snapshot is convenience state only: it is never trusted for
//! server-side authorization.

use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed keys of the persisted snapshot.
pub mod snapshot_keys {
    /// Serialized [`tableside_core::Principal`] of the signed-in user.
    pub const USER: &str = "user";
    /// `"true"` / `"false"` authenticated flag.
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";
    /// Serialized optimistic order cache.
    pub const PENDING_ORDERS: &str = "pendingOrders";
}

/// Client-local key/value storage.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage, used in tests and headless deployments.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

impl MemoryStorage {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
