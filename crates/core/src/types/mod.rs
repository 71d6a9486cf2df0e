//! Core types for Tableside.
//!
//! This module provides type-safe wrappers and document schemas for the
//! domain: menu items, orders, reviews, user records, and principals.

pub mod id;
pub mod menu;
pub mod order;
pub mod principal;
pub mod review;
pub mod role;
pub mod status;
pub mod user;

pub use id::*;
pub use menu::MenuItem;
pub use order::{Order, OrderItem};
pub use principal::{AuthenticatedPrincipal, Principal};
pub use review::Review;
pub use role::Role;
pub use status::{OrderStatus, StatusTransitionError};
pub use user::UserRecord;
