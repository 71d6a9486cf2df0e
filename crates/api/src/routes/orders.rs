//! Order handlers.
//!
//! Placing an order never requires a session; the resulting document is owned
//! by the acting principal's subject id or the guest sentinel. Status updates
//! are management-only and move forward only, with cancellation allowed from
//! any non-terminal state.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tableside_core::policy::{Action, authorize};
use tableside_core::{Order, OrderItem, OrderStatus, Principal, UserId};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireManagement};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub customer_name: Option<String>,
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

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// `POST /api/orders` - place an order. Input is validated before the store
/// is contacted; the server stamps status, owner, and creation time.
pub async fn create_order(
    State(state): State<AppState>,
    OptionalAuth(principal): OptionalAuth,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    if body.items.is_empty() {
        return Err(AppError::Validation("order has no items".to_owned()));
    }
    if body.total_amount < Decimal::ZERO {
        return Err(AppError::Validation("negative total".to_owned()));
    }
    authorize(&principal, &Action::CreateOrder)?;

    let customer_name = body
        .customer_name
        .as_deref()
        .unwrap_or_else(|| fallback_customer_name(&principal));

    let doc = state
        .orders()
        .add(&OrderDraft {
            items: &body.items,
            total_amount: body.total_amount,
            customer_name,
            status: OrderStatus::Pending,
            user_id: principal.owner_id(),
            created_at: Utc::now(),
            has_review: false,
        })
        .await?;

    let order: Order = doc.deserialize()?;
    tracing::info!(order_id = %order.id, user_id = %order.user_id, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders/{id}` - order detail. Public; a miss is a JSON 404.
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let doc = state
        .orders()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("orders/{id}")))?;
    Ok(Json(doc.deserialize()?))
}

/// `PATCH /api/orders/{id}` - status update. Management only; the transition
/// is checked against the current document, and repeating the current status
/// is an idempotent no-op.
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireManagement(_principal): RequireManagement,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Order>> {
    let orders = state.orders();
    let doc = orders
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("orders/{id}")))?;
    let mut order: Order = doc.deserialize()?;

    order.status.check_transition(body.status)?;
    orders
        .update(&id, &serde_json::json!({"status": body.status}))
        .await?;

    order.status = body.status;
    Ok(Json(order))
}

fn fallback_customer_name(principal: &Principal) -> &str {
    match principal {
        Principal::Guest => "Guest",
        Principal::Authenticated(p) => &p.display_name,
    }
}
