//! Tableside Store - document store client boundary.
//!
//! The platform persists everything in a managed document store: key-addressed,
//! schema-flexible records organized into named collections, queryable by
//! field and subscribable for live updates. This crate defines that boundary
//! and ships an in-process implementation with the same contract:
//!
//! - `get` / `query` / `add` / `set` / `update` (partial merge) / `delete`
//! - push subscriptions that deliver the **full current result set** of a
//!   query after every mutation of the collection, in arrival order
//!
//! The store gives no cross-document transactions and no referential
//! integrity; multi-document invariants (such as the order/review
//! cross-reference) are owned by the layers above. Writes are
//! last-write-wins per document.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod document;
mod error;
mod memory;
mod query;

pub use document::Document;
pub use error::StoreError;
pub use memory::{Collection, MemoryStore, Subscription};
pub use query::{Direction, Query};

/// Well-known collection names.
pub mod collections {
    pub const MENU: &str = "menu";
    pub const ORDERS: &str = "orders";
    pub const REVIEWS: &str = "reviews";
    pub const USERS: &str = "users";
}
