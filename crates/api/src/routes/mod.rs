//! HTTP route handlers for the API service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness check
//!
//! # Menu (public)
//! GET    /api/menu                   - Menu catalog (cached)
//! GET    /api/menu/{id}              - Single menu item
//!
//! # Orders
//! POST   /api/orders                 - Place an order (guest allowed)
//! GET    /api/orders/{id}            - Order detail (public)
//! PATCH  /api/orders/{id}            - Status update (management)
//!
//! # Reviews
//! GET    /api/reviews                - All reviews, most recent first (public)
//! POST   /api/reviews                - Post a review (guest allowed)
//! GET    /api/reviews/user/{userId}  - One user's reviews (same user or admin)
//! PATCH  /api/reviews/{id}           - Edit a review (owner or admin)
//! DELETE /api/reviews/{id}           - Delete a review (owner or admin)
//! PATCH  /api/reviews/{id}/read      - Mark read (management)
//!
//! # Users
//! POST   /api/users                  - Complete registration (authenticated)
//! GET    /api/users                  - List profiles (management)
//! GET    /api/users/{id}             - Read profile (self or management)
//! PATCH  /api/users/{id}             - Update profile (self or admin)
//! DELETE /api/users/{id}             - Delete account (admin)
//! ```

pub mod menu;
pub mod orders;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the full API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/menu", get(menu::list_menu))
        .route("/api/menu/{id}", get(menu::get_menu_item))
        .route("/api/orders", post(orders::create_order))
        .route(
            "/api/orders/{id}",
            get(orders::get_order).patch(orders::update_order_status),
        )
        .route(
            "/api/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/api/reviews/user/{user_id}", get(reviews::list_user_reviews))
        .route(
            "/api/reviews/{id}",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/api/reviews/{id}/read", patch(reviews::mark_review_read))
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}
