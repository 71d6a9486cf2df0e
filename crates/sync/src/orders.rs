//! Order lifecycle manager.
//!
//! Owns the canonical order state machine on the client: optimistic local
//! cache, forward-only status updates, and reconciliation with the
//! authoritative store over a push subscription.
//!
//! The subscription is a standing query over *all* orders ordered by
//! `createdAt` descending; ownership filtering happens client-side after the
//! push because the store's index does not support the compound filter+sort
//! this view needs. That trade-off is acceptable at current scale; a larger
//! deployment should move the filter into a composite index.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tableside_core::policy::{Action, authorize};
use tableside_core::{Order, OrderId, OrderItem, OrderStatus, Principal, UserId};
use tableside_identity::IdentityProvider;
use tableside_store::{
    Collection, Direction, Document, MemoryStore, Query, Subscription, collections,
};

use crate::error::SyncError;
use crate::session::Session;
use crate::storage::{LocalStorage, snapshot_keys};

/// How long a written-but-unconfirmed order may wait for a push before it is
/// marked errored.
const DEFAULT_PENDING_TIMEOUT_SECS: i64 = 30;

/// Synchronization state of a cached order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CacheState {
    /// Written to the store, not yet seen in a subscription push.
    PendingSync { since: DateTime<Utc> },
    /// Present in the latest authoritative push.
    Confirmed,
    /// The bounded confirmation timeout elapsed; surfaced to the caller.
    Error { detail: String },
}

/// An order plus its cache state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedOrder {
    pub order: Order,
    #[serde(flatten)]
    pub state: CacheState,
}

/// A live subscription over the orders collection. Dropping the feed
/// detaches it synchronously; drop feeds before clearing any local state on
/// logout.
pub struct OrdersFeed {
    subscription: Subscription,
}

impl OrdersFeed {
    /// Wait for the next authoritative push.
    pub async fn next_push(&mut self) -> Option<Vec<Document>> {
        self.subscription.next_push().await
    }

    /// Take a push if one is already queued.
    pub fn try_push(&mut self) -> Option<Vec<Document>> {
        self.subscription.try_push()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderDraft<'a> {
    items: &'a [OrderItem],
    total_amount: Decimal,
    customer_name: &'a str,
    status: OrderStatus,
    user_id: UserId,
    created_at: DateTime<Utc>,
    has_review: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPatch {
    status: OrderStatus,
}

/// The order lifecycle manager.
pub struct OrderManager {
    orders: Collection,
    identity: IdentityProvider,
    storage: Arc<dyn LocalStorage>,
    cache: Mutex<Vec<CachedOrder>>,
    pending_timeout: Duration,
}

impl OrderManager {
    #[must_use]
    pub fn new(
        store: &MemoryStore,
        identity: IdentityProvider,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        Self {
            orders: store.collection(collections::ORDERS),
            identity,
            storage,
            cache: Mutex::new(Vec::new()),
            pending_timeout: Duration::seconds(DEFAULT_PENDING_TIMEOUT_SECS),
        }
    }

    /// Override the pending-confirmation timeout.
    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// Rebuild the optimistic cache from the persisted snapshot. Entries stay
    /// in their persisted state until live pushes reconcile them.
    pub fn hydrate(&self) {
        let Some(raw) = self.storage.get(snapshot_keys::PENDING_ORDERS) else {
            return;
        };
        match serde_json::from_str::<Vec<CachedOrder>>(&raw) {
            Ok(entries) => *self.lock() = entries,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable order snapshot");
                self.storage.remove(snapshot_keys::PENDING_ORDERS);
            }
        }
    }

    /// Create an order.
    ///
    /// The store write precedes the cache insert, so the local entry is
    /// optimistic-confirmed: real remotely, pending only its first push.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] for empty items or negative totals,
    /// [`SyncError::Authentication`] when the fresh-token fetch fails,
    /// [`SyncError::Unavailable`] when the write fails.
    pub async fn create_order(
        &self,
        session: &Session,
        items: Vec<OrderItem>,
        total_amount: Decimal,
        customer_name: &str,
    ) -> Result<Order, SyncError> {
        if items.is_empty() {
            return Err(SyncError::Validation("order must contain at least one item".into()));
        }
        if total_amount < Decimal::ZERO {
            return Err(SyncError::Validation("totalAmount must not be negative".into()));
        }
        authorize(&session.principal, &Action::CreateOrder)?;
        self.fresh_token(&session.principal).await?;

        let draft = OrderDraft {
            items: &items,
            total_amount,
            customer_name,
            status: OrderStatus::Pending,
            user_id: session.principal.owner_id(),
            created_at: Utc::now(),
            has_review: false,
        };
        let doc = self.orders.add(&draft).await?;
        let order: Order = doc.deserialize()?;

        let mut cache = self.lock();
        cache.insert(
            0,
            CachedOrder {
                order: order.clone(),
                state: CacheState::PendingSync { since: Utc::now() },
            },
        );
        Self::persist(&self.storage, &cache);
        drop(cache);

        tracing::debug!(order = %order.id, "order created");
        Ok(order)
    }

    /// Fetch a single order by ID.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] when no such document exists.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, SyncError> {
        let doc = self
            .orders
            .get(order_id.as_str())
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("orders/{order_id}")))?;
        Ok(doc.deserialize()?)
    }

    /// Advance an order's status. Management only; transitions are
    /// forward-only and idempotent for the same status.
    ///
    /// # Errors
    ///
    /// [`SyncError::Authorization`] without management access,
    /// [`SyncError::NotFound`] when the store reports no such document,
    /// [`SyncError::Validation`] for backward transitions.
    pub async fn update_order_status(
        &self,
        session: &Session,
        order_id: &OrderId,
        new_status: OrderStatus,
    ) -> Result<(), SyncError> {
        authorize(&session.principal, &Action::UpdateOrderStatus)?;
        self.fresh_token(&session.principal).await?;

        let current = self.get_order(order_id).await?;
        current
            .status
            .check_transition(new_status)
            .map_err(|err| SyncError::Validation(err.to_string()))?;

        self.orders
            .update(order_id.as_str(), &StatusPatch { status: new_status })
            .await?;

        let mut cache = self.lock();
        if let Some(entry) = cache.iter_mut().find(|e| e.order.id == *order_id) {
            entry.order.status = new_status;
        }
        Self::persist(&self.storage, &cache);
        Ok(())
    }

    /// Open the standing subscription feeding [`Self::apply_push`].
    pub async fn subscribe_own_orders(&self, _session: &Session) -> OrdersFeed {
        let query = Query::all().order_by("createdAt", Direction::Descending);
        OrdersFeed {
            subscription: self.orders.subscribe(query).await,
        }
    }

    /// Reconcile the cache against one authoritative push.
    ///
    /// The push is filtered to the session's owner ID, then diff-applied:
    /// pushed documents win by ID; local optimistic entries absent from the
    /// push are retained until the bounded timeout, after which they flip to
    /// an error state rather than being silently dropped. Errored entries are
    /// kept for the caller to surface.
    pub fn apply_push(&self, session: &Session, docs: &[Document]) {
        let owner = session.principal.owner_id();
        let pushed: Vec<Order> = docs
            .iter()
            .filter_map(|doc| doc.deserialize::<Order>().ok())
            .filter(|order| order.user_id == owner)
            .collect();

        let now = Utc::now();
        let mut cache = self.lock();
        let mut next: Vec<CachedOrder> = Vec::with_capacity(pushed.len());

        // Unconfirmed local entries survive the wholesale replace.
        for entry in cache.iter() {
            if pushed.iter().any(|order| order.id == entry.order.id) {
                continue;
            }
            match &entry.state {
                CacheState::PendingSync { since } => {
                    if now - *since > self.pending_timeout {
                        next.push(CachedOrder {
                            order: entry.order.clone(),
                            state: CacheState::Error {
                                detail: "order write was never confirmed by the store".into(),
                            },
                        });
                    } else {
                        next.push(entry.clone());
                    }
                }
                CacheState::Error { .. } => next.push(entry.clone()),
                CacheState::Confirmed => {}
            }
        }

        next.extend(pushed.into_iter().map(|order| CachedOrder {
            order,
            state: CacheState::Confirmed,
        }));

        *cache = next;
        Self::persist(&self.storage, &cache);
    }

    /// Flip timed-out optimistic entries to the error state without waiting
    /// for a push, returning the IDs newly marked. Confirmed entries are
    /// never touched.
    pub fn expire_pending(&self) -> Vec<OrderId> {
        let now = Utc::now();
        let mut expired = Vec::new();
        let mut cache = self.lock();
        for entry in cache.iter_mut() {
            if let CacheState::PendingSync { since } = &entry.state
                && now - *since > self.pending_timeout
            {
                entry.state = CacheState::Error {
                    detail: "order write was never confirmed by the store".into(),
                };
                expired.push(entry.order.id.clone());
            }
        }
        Self::persist(&self.storage, &cache);
        expired
    }

    /// Snapshot of the cached orders, most recent first.
    #[must_use]
    pub fn orders(&self) -> Vec<CachedOrder> {
        self.lock().clone()
    }

    /// Drop the feed, then clear the cache. The drop happens first so a late
    /// push cannot repopulate the cache after logout.
    pub fn disconnect(&self, feed: OrdersFeed) {
        drop(feed);
        self.lock().clear();
        self.storage.remove(snapshot_keys::PENDING_ORDERS);
    }

    /// Fetch a fresh token for the privileged call about to happen. Guests
    /// pass through; an authenticated principal whose token fetch fails
    /// short-circuits the call.
    async fn fresh_token(&self, principal: &Principal) -> Result<(), SyncError> {
        if let Some(subject) = principal.subject_id() {
            self.identity
                .issue_token(subject.as_str())
                .await
                .map_err(|err| SyncError::Authentication(err.to_string()))?;
        }
        Ok(())
    }

    fn persist(storage: &Arc<dyn LocalStorage>, cache: &[CachedOrder]) {
        match serde_json::to_string(cache) {
            Ok(raw) => storage.set(snapshot_keys::PENDING_ORDERS, &raw),
            Err(err) => tracing::warn!(error = %err, "failed to persist order snapshot"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CachedOrder>> {
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use tableside_core::{AuthenticatedPrincipal, Role};

    fn manager(store: &MemoryStore) -> OrderManager {
        OrderManager::new(
            store,
            IdentityProvider::new(),
            Arc::new(MemoryStorage::new()),
        )
    }

    fn guest() -> Session {
        Session::guest()
    }

    async fn staff_session(identity: &IdentityProvider) -> Session {
        let uid = identity
            .create_user("staff@example.com", "Staff@2024", Some("staff"))
            .await
            .unwrap();
        Session {
            principal: Principal::Authenticated(AuthenticatedPrincipal {
                subject_id: UserId::new(uid),
                display_name: "staff".into(),
                email: "staff@example.com".into(),
                role: Role::Staff,
            }),
            token: None,
        }
    }

    fn burger() -> Vec<OrderItem> {
        vec![OrderItem {
            name: "Burger".into(),
            quantity: 1,
            price: None,
        }]
    }

    #[tokio::test]
    async fn test_create_order_round_trip() {
        let store = MemoryStore::new();
        let manager = manager(&store);

        let order = manager
            .create_order(&guest(), burger(), Decimal::new(1250, 2), "Alice")
            .await
            .unwrap();

        let fetched = manager.get_order(&order.id).await.unwrap();
        assert_eq!(fetched.items, order.items);
        assert_eq!(fetched.total_amount, Decimal::new(1250, 2));
        assert_eq!(fetched.customer_name, "Alice");
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.user_id, UserId::guest());
        assert!(!fetched.has_review);
    }

    #[tokio::test]
    async fn test_create_order_validation_never_contacts_store() {
        let store = MemoryStore::new();
        let manager = manager(&store);

        let err = manager
            .create_order(&guest(), vec![], Decimal::ZERO, "Bob")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));

        let err = manager
            .create_order(&guest(), burger(), Decimal::new(-1, 0), "Bob")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));

        let docs = store
            .collection(collections::ORDERS)
            .query(&Query::all())
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_status_update_requires_management() {
        let store = MemoryStore::new();
        let manager = manager(&store);
        let order = manager
            .create_order(&guest(), burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();

        let err = manager
            .update_order_status(&guest(), &order.id, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Authentication(_)));

        let unchanged = manager.get_order(&order.id).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_update_is_idempotent() {
        let store = MemoryStore::new();
        let identity = IdentityProvider::new();
        let manager = OrderManager::new(&store, identity.clone(), Arc::new(MemoryStorage::new()));
        let staff = staff_session(&identity).await;

        let order = manager
            .create_order(&guest(), burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();

        manager
            .update_order_status(&staff, &order.id, OrderStatus::Ready)
            .await
            .unwrap();
        manager
            .update_order_status(&staff, &order.id, OrderStatus::Ready)
            .await
            .unwrap();

        assert_eq!(
            manager.get_order(&order.id).await.unwrap().status,
            OrderStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_backward_transition_rejected() {
        let store = MemoryStore::new();
        let identity = IdentityProvider::new();
        let manager = OrderManager::new(&store, identity.clone(), Arc::new(MemoryStorage::new()));
        let staff = staff_session(&identity).await;

        let order = manager
            .create_order(&guest(), burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();
        manager
            .update_order_status(&staff, &order.id, OrderStatus::Completed)
            .await
            .unwrap();

        let err = manager
            .update_order_status(&staff, &order.id, OrderStatus::Preparing)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let store = MemoryStore::new();
        let identity = IdentityProvider::new();
        let manager = OrderManager::new(&store, identity.clone(), Arc::new(MemoryStorage::new()));
        let staff = staff_session(&identity).await;

        let err = manager
            .update_order_status(&staff, &OrderId::new("missing"), OrderStatus::Ready)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_push_confirms_optimistic_entry() {
        let store = MemoryStore::new();
        let manager = manager(&store);
        let session = guest();

        let mut feed = manager.subscribe_own_orders(&session).await;
        let _ = feed.next_push().await; // initial snapshot

        let order = manager
            .create_order(&session, burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();
        assert!(matches!(
            manager.orders()[0].state,
            CacheState::PendingSync { .. }
        ));

        let push = feed.next_push().await.unwrap();
        manager.apply_push(&session, &push);

        let cached = manager.orders();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].order.id, order.id);
        assert_eq!(cached[0].state, CacheState::Confirmed);
    }

    #[tokio::test]
    async fn test_push_filters_to_own_orders() {
        let store = MemoryStore::new();
        let manager = manager(&store);
        let session = guest();

        // A foreign order lands in the collection.
        store
            .collection(collections::ORDERS)
            .add(&serde_json::json!({
                "items": [{"name": "Salad", "qty": 1}],
                "totalAmount": "4.50",
                "customerName": "Zoe",
                "status": "pending",
                "userId": "someone-else",
                "createdAt": "2026-01-01T00:00:00Z",
                "hasReview": false,
            }))
            .await
            .unwrap();

        let mut feed = manager.subscribe_own_orders(&session).await;
        let push = feed.next_push().await.unwrap();
        assert_eq!(push.len(), 1);
        manager.apply_push(&session, &push);
        assert!(manager.orders().is_empty());
    }

    #[tokio::test]
    async fn test_unconfirmed_entry_times_out_to_error() {
        let store = MemoryStore::new();
        let manager = OrderManager::new(
            &store,
            IdentityProvider::new(),
            Arc::new(MemoryStorage::new()),
        )
        .with_pending_timeout(Duration::zero());
        let session = guest();

        manager
            .create_order(&session, burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();

        // An empty authoritative push that does not contain the local entry.
        manager.apply_push(&session, &[]);

        let cached = manager.orders();
        assert_eq!(cached.len(), 1);
        assert!(matches!(cached[0].state, CacheState::Error { .. }));
    }

    #[tokio::test]
    async fn test_expire_pending_reports_ids() {
        let store = MemoryStore::new();
        let manager = OrderManager::new(
            &store,
            IdentityProvider::new(),
            Arc::new(MemoryStorage::new()),
        )
        .with_pending_timeout(Duration::zero());
        let session = guest();

        let order = manager
            .create_order(&session, burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();
        let expired = manager.expire_pending();
        assert_eq!(expired, vec![order.id]);
    }

    #[tokio::test]
    async fn test_hydrate_restores_snapshot() {
        let store = MemoryStore::new();
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let manager = OrderManager::new(&store, IdentityProvider::new(), Arc::clone(&storage));
        let session = guest();

        manager
            .create_order(&session, burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();

        // A second manager over the same storage sees the persisted cache.
        let resumed = OrderManager::new(&store, IdentityProvider::new(), storage);
        assert!(resumed.orders().is_empty());
        resumed.hydrate();
        assert_eq!(resumed.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_clears_cache_and_snapshot() {
        let store = MemoryStore::new();
        let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
        let manager = OrderManager::new(&store, IdentityProvider::new(), Arc::clone(&storage));
        let session = guest();

        let feed = manager.subscribe_own_orders(&session).await;
        manager
            .create_order(&session, burger(), Decimal::new(899, 2), "Bob")
            .await
            .unwrap();

        manager.disconnect(feed);
        assert!(manager.orders().is_empty());
        assert!(storage.get(snapshot_keys::PENDING_ORDERS).is_none());
    }
}
