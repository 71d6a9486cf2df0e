//! Tableside Sync - client-side state synchronization.
//!
//! This crate owns the rules that keep client-held state (pending orders,
//! reviews, the current session) consistent with the authoritative store
//! under concurrent writers:
//!
//! - [`session`] - resolves credentials into an explicit [`session::Session`]
//!   that is passed to every manager call; no ambient singleton.
//! - [`orders`] - the order lifecycle manager: optimistic local cache,
//!   forward-only status updates, reconciliation against push subscriptions.
//! - [`reviews`] - the review moderation manager: ownership-gated CRUD and
//!   the two-phase order/review cross-reference.
//! - [`storage`] - the persisted session snapshot (instant resume, never
//!   trusted for server-side authorization).
//!
//! Every privileged remote call fetches a fresh identity token immediately
//! before the call; a failed fetch short-circuits with an authentication
//! error rather than attempting the call unauthenticated.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod orders;
pub mod reviews;
pub mod session;
pub mod storage;

pub use error::SyncError;
pub use orders::{CacheState, CachedOrder, OrderManager, OrdersFeed};
pub use reviews::{ReviewManager, ReviewPatch};
pub use session::{BootstrapAccount, Credentials, Session, SessionResolver};
pub use storage::{LocalStorage, MemoryStorage, snapshot_keys};
