//! In-process document store with push subscriptions.
//!
//! Stands in for the managed store behind the same contract. All state lives
//! behind one mutex; operations are short and never await while holding it,
//! and push notifications go through unbounded channels so a mutation never
//! blocks on a slow subscriber.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::document::{Document, to_object};
use crate::error::StoreError;
use crate::query::Query;

#[derive(Default)]
struct CollectionData {
    docs: BTreeMap<String, Map<String, Value>>,
    watchers: Vec<Watcher>,
    /// Remaining injected write failures (test/chaos hook).
    failing_writes: u32,
}

struct Watcher {
    query: Query,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

/// Handle to the in-process document store. Cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, CollectionData>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to a named collection. Collections spring into existence on
    /// first use.
    #[must_use]
    pub fn collection(&self, name: &str) -> Collection {
        Collection {
            store: self.clone(),
            name: name.to_owned(),
        }
    }

    /// Make the next `count` writes to `collection` fail with
    /// [`StoreError::Unavailable`]. Reads are unaffected.
    ///
    /// This is the chaos hook the two-phase update tests lean on; the managed
    /// store fails the same way when the backend is unreachable.
    pub fn inject_write_failures(&self, collection: &str, count: u32) {
        let mut inner = self.lock();
        inner.entry(collection.to_owned()).or_default().failing_writes = count;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CollectionData>> {
        // A poisoned store mutex means a panic mid-write; propagating the
        // inner state is still sound because writes are single assignments.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A named collection within a [`MemoryStore`].
#[derive(Clone)]
pub struct Collection {
    store: MemoryStore,
    name: String,
}

impl Collection {
    /// The collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch a document by ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    pub async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.store.lock();
        Ok(inner.get(&self.name).and_then(|c| {
            c.docs.get(id).map(|data| Document {
                id: id.to_owned(),
                data: data.clone(),
            })
        }))
    }

    /// Run a query and return the current result set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    pub async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let inner = self.store.lock();
        let docs = inner.get(&self.name).map_or_else(Vec::new, |c| {
            c.docs
                .iter()
                .map(|(id, data)| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect()
        });
        drop(inner);
        Ok(query.apply(docs))
    }

    /// Add a new document with a generated ID and return it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAnObject`] for non-object payloads and
    /// [`StoreError::Unavailable`] on backend failure.
    pub async fn add<T: Serialize>(&self, data: &T) -> Result<Document, StoreError> {
        let object = to_object(data)?;
        let id = Uuid::new_v4().to_string();
        self.write(|docs| {
            docs.insert(id.clone(), object.clone());
            Ok(())
        })?;
        Ok(Document { id, data: object })
    }

    /// Create or replace the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAnObject`] for non-object payloads and
    /// [`StoreError::Unavailable`] on backend failure.
    pub async fn set<T: Serialize>(&self, id: &str, data: &T) -> Result<(), StoreError> {
        let object = to_object(data)?;
        self.write(|docs| {
            docs.insert(id.to_owned(), object);
            Ok(())
        })
    }

    /// Merge `patch`'s top-level fields into the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the document does not exist,
    /// [`StoreError::NotAnObject`] for non-object patches, and
    /// [`StoreError::Unavailable`] on backend failure.
    pub async fn update<T: Serialize>(&self, id: &str, patch: &T) -> Result<(), StoreError> {
        let object = to_object(patch)?;
        let collection = self.name.clone();
        self.write(|docs| match docs.get_mut(id) {
            Some(existing) => {
                for (key, value) in object {
                    existing.insert(key, value);
                }
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection,
                id: id.to_owned(),
            }),
        })
    }

    /// Delete the document at `id`. Deleting an absent document is a no-op,
    /// matching the managed store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on backend failure.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.write(|docs| {
            docs.remove(id);
            Ok(())
        })
    }

    /// Open a push subscription for `query`.
    ///
    /// The current result set is delivered immediately; every subsequent
    /// mutation of the collection delivers the full result set again. Pushes
    /// queue in arrival order. Dropping the [`Subscription`] detaches it.
    pub async fn subscribe(&self, query: Query) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.store.lock();
        let collection = inner.entry(self.name.clone()).or_default();
        let snapshot = query.apply(snapshot_of(collection));
        // Initial snapshot; an unbounded channel cannot refuse it.
        let _ = tx.send(snapshot);
        collection.watchers.push(Watcher { query, tx });
        Subscription { rx }
    }

    /// Perform a mutation and fan the new result sets out to watchers.
    fn write(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, Map<String, Value>>) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut inner = self.store.lock();
        let collection = inner.entry(self.name.clone()).or_default();

        if collection.failing_writes > 0 {
            collection.failing_writes -= 1;
            tracing::warn!(collection = %self.name, "injected write failure");
            return Err(StoreError::Unavailable("injected write failure".to_owned()));
        }

        mutate(&mut collection.docs)?;

        let docs = snapshot_of(collection);
        collection.watchers.retain(|watcher| {
            let result = watcher.query.apply(docs.clone());
            watcher.tx.send(result).is_ok()
        });
        Ok(())
    }
}

fn snapshot_of(collection: &CollectionData) -> Vec<Document> {
    collection
        .docs
        .iter()
        .map(|(id, data)| Document {
            id: id.clone(),
            data: data.clone(),
        })
        .collect()
}

/// A live push subscription. Drop it to unsubscribe; detachment is
/// synchronous, so no push can arrive after the drop returns.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
}

impl Subscription {
    /// Wait for the next push. Returns `None` once the store is gone.
    pub async fn next_push(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Take a push if one is already queued.
    pub fn try_push(&mut self) -> Option<Vec<Document>> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_get_round_trip() {
        let store = MemoryStore::new();
        let orders = store.collection("orders");

        let doc = orders.add(&json!({"customerName": "Alice"})).await.unwrap();
        let fetched = orders.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.field("customerName"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn test_update_merges_partial_fields() {
        let store = MemoryStore::new();
        let orders = store.collection("orders");
        let doc = orders
            .add(&json!({"status": "pending", "customerName": "Bob"}))
            .await
            .unwrap();

        orders.update(&doc.id, &json!({"status": "ready"})).await.unwrap();

        let fetched = orders.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.field("status"), Some(&json!("ready")));
        assert_eq!(fetched.field("customerName"), Some(&json!("Bob")));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .collection("orders")
            .update("missing", &json!({"status": "ready"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscription_receives_initial_and_mutation_pushes() {
        let store = MemoryStore::new();
        let orders = store.collection("orders");

        let mut sub = orders.subscribe(Query::all()).await;
        assert_eq!(sub.next_push().await.unwrap().len(), 0);

        orders.add(&json!({"customerName": "Alice"})).await.unwrap();
        assert_eq!(sub.next_push().await.unwrap().len(), 1);

        orders.add(&json!({"customerName": "Bob"})).await.unwrap();
        let push = sub.next_push().await.unwrap();
        assert_eq!(push.len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_respects_query() {
        let store = MemoryStore::new();
        let orders = store.collection("orders");
        let mut sub = orders
            .subscribe(Query::all().order_by("createdAt", Direction::Descending))
            .await;
        let _ = sub.next_push().await;

        orders
            .add(&json!({"createdAt": "2026-01-01T00:00:00Z"}))
            .await
            .unwrap();
        orders
            .add(&json!({"createdAt": "2026-02-01T00:00:00Z"}))
            .await
            .unwrap();

        let _ = sub.next_push().await;
        let push = sub.next_push().await.unwrap();
        assert_eq!(
            push[0].field("createdAt"),
            Some(&json!("2026-02-01T00:00:00Z"))
        );
    }

    #[tokio::test]
    async fn test_dropped_subscription_detaches() {
        let store = MemoryStore::new();
        let orders = store.collection("orders");
        let sub = orders.subscribe(Query::all()).await;
        drop(sub);
        // The dead watcher is pruned on the next write.
        orders.add(&json!({"x": 1})).await.unwrap();
        orders.add(&json!({"x": 2})).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_write_failures_then_recovery() {
        let store = MemoryStore::new();
        store.inject_write_failures("orders", 1);
        let orders = store.collection("orders");

        let err = orders.add(&json!({"x": 1})).await.unwrap_err();
        assert!(err.is_retryable());

        // Next write succeeds.
        orders.add(&json!({"x": 1})).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let orders = store.collection("orders");
        let doc = orders.add(&json!({"x": 1})).await.unwrap();
        orders.delete(&doc.id).await.unwrap();
        orders.delete(&doc.id).await.unwrap();
        assert!(orders.get(&doc.id).await.unwrap().is_none());
    }
}
