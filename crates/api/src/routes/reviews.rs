//! Review handlers.
//!
//! The server stamps `createdAt`, `isRead:false`, and the username; a
//! client-supplied username is never trusted. Reviews that reference an order
//! flip that order's `hasReview` flag in a second write, and a failure of the
//! second write is surfaced instead of hidden (the review itself is already
//! committed at that point).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tableside_core::policy::{Action, authorize};
use tableside_core::review::validate_review_input;
use tableside_core::{OrderId, Review, UserId};
use tableside_store::{Direction, Query, collections};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth, RequireManagement};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewPatchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDraft<'a> {
    rating: u8,
    comment: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a OrderId>,
    user_id: UserId,
    username: &'a str,
    created_at: DateTime<Utc>,
    is_read: bool,
}

/// `GET /api/reviews` - every review, most recent first.
pub async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<Review>>> {
    let docs = state
        .reviews()
        .query(&Query::all().order_by("createdAt", Direction::Descending))
        .await?;
    let reviews = docs
        .iter()
        .map(tableside_store::Document::deserialize)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Json(reviews))
}

/// `POST /api/reviews` - post a review. Guests post as "Anonymous".
pub async fn create_review(
    State(state): State<AppState>,
    OptionalAuth(principal): OptionalAuth,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    validate_review_input(body.rating, &body.comment).map_err(AppError::Validation)?;
    authorize(&principal, &Action::CreateReview)?;

    let doc = state
        .reviews()
        .add(&ReviewDraft {
            rating: body.rating,
            comment: &body.comment,
            order_id: body.order_id.as_ref(),
            user_id: principal.owner_id(),
            username: principal.review_username(),
            created_at: Utc::now(),
            is_read: false,
        })
        .await?;
    let review: Review = doc.deserialize()?;

    if let Some(order_id) = &body.order_id {
        link_order(&state, &review, order_id, true).await?;
    }
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /api/reviews/user/{userId}` - one user's reviews, most recent first.
/// Same user or admin.
pub async fn list_user_reviews(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let user = UserId::new(user_id);
    authorize(&principal, &Action::ReadUserReviews { user: &user })?;

    let docs = state
        .reviews()
        .query(&Query::field_eq("userId", user.as_str()))
        .await?;
    let mut reviews: Vec<Review> = docs
        .iter()
        .map(tableside_store::Document::deserialize)
        .collect::<std::result::Result<_, _>>()?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(reviews))
}

/// `PATCH /api/reviews/{id}` - edit rating or comment. Owner or admin; the
/// merged result is re-validated.
pub async fn update_review(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<ReviewPatchRequest>,
) -> Result<Json<Review>> {
    let mut review = fetch_review(&state, &id).await?;
    authorize(&principal, &Action::UpdateReview { owner: &review.user_id })?;

    let rating = body.rating.unwrap_or(review.rating);
    let comment = body.comment.as_deref().unwrap_or(&review.comment);
    validate_review_input(rating, comment).map_err(AppError::Validation)?;

    state.reviews().update(&id, &body).await?;

    review.rating = rating;
    review.comment = comment.to_owned();
    Ok(Json(review))
}

/// `DELETE /api/reviews/{id}` - delete a review. Owner or admin; a linked
/// order gets its `hasReview` flag cleared afterwards.
pub async fn delete_review(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let review = fetch_review(&state, &id).await?;
    authorize(&principal, &Action::DeleteReview { owner: &review.user_id })?;

    state.reviews().delete(&id).await?;

    if let Some(order_id) = &review.order_id {
        link_order(&state, &review, order_id, false).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /api/reviews/{id}/read` - mark a review as handled. Management
/// only, independent of ownership.
pub async fn mark_review_read(
    State(state): State<AppState>,
    RequireManagement(_principal): RequireManagement,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .reviews()
        .update(&id, &serde_json::json!({"isRead": true}))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_review(state: &AppState, id: &str) -> Result<Review> {
    let doc = state
        .reviews()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("reviews/{id}")))?;
    Ok(doc.deserialize()?)
}

async fn link_order(
    state: &AppState,
    review: &Review,
    order_id: &OrderId,
    has_review: bool,
) -> Result<()> {
    state
        .orders()
        .update(order_id.as_str(), &serde_json::json!({"hasReview": has_review}))
        .await
        .map_err(|err| AppError::Integrity {
            committed: format!("{}/{}", collections::REVIEWS, review.id),
            pending: format!("{}/{order_id}", collections::ORDERS),
            detail: err.to_string(),
        })
}
