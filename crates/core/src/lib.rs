//! Tableside Core - Shared types library.
//!
//! This crate provides the common types used across all Tableside components:
//! - `store` - Document store client boundary
//! - `identity` - Identity provider boundary
//! - `api` - HTTP API service
//! - `sync` - Client-side state synchronization layer
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no store
//! access, no HTTP. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Domain documents, newtype IDs, roles, statuses, principals
//! - [`policy`] - Pure authorization policy over (principal, action)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod policy;
pub mod types;

pub use types::*;
