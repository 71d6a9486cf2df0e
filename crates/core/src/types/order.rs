//! Order documents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, UserId};
use super::status::OrderStatus;

/// A single line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    #[serde(rename = "qty")]
    pub quantity: u32,
    /// Unit price, when the menu item carried one at order time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

/// An order document.
///
/// `user_id` is the guest sentinel for orders placed without an authenticated
/// session. `has_review` mirrors "a review currently references this order":
/// the cross-reference is maintained by the review moderation layer, not the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub status: OrderStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub has_review: bool,
}
