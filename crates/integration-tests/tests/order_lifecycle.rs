//! Integration tests for the order lifecycle over HTTP.
//!
//! Covers guest ordering, public order reads, management-gated status
//! updates, and the forward-only transition rules.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use tableside_integration_tests::{STAFF_EMAIL, TestContext};

fn burger_order() -> Value {
    json!({
        "items": [{"name": "Classic Burger", "qty": 2, "price": "8.99"}],
        "totalAmount": "17.98",
        "customerName": "Walk-in",
    })
}

async fn place_guest_order(ctx: &TestContext) -> String {
    let (status, body) = ctx
        .send(Method::POST, "/api/orders", None, Some(burger_order()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
async fn test_guest_places_order() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx
        .send(Method::POST, "/api/orders", None, Some(burger_order()))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["userId"], "guest");
    assert_eq!(body["hasReview"], false);
    assert_eq!(body["totalAmount"], "17.98");

    // Public read-back.
    let id = body["id"].as_str().unwrap();
    let (status, fetched) = ctx
        .send(Method::GET, &format!("/api/orders/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["customerName"], "Walk-in");
}

#[tokio::test]
async fn test_authenticated_order_is_owned() {
    let ctx = TestContext::new().await;
    let (uid, token) = ctx.signed_up_user("diner").await;

    let (status, body) = ctx
        .send(Method::POST, "/api/orders", Some(&token), Some(burger_order()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userId"], uid);
}

#[tokio::test]
async fn test_order_validation_rejects_bad_input() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/orders",
            None,
            Some(json!({"items": [], "totalAmount": "5.00"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no items"));

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/orders",
            None,
            Some(json!({
                "items": [{"name": "Burger", "qty": 1}],
                "totalAmount": "-1.00",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_order_is_json_404() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx
        .send(Method::GET, "/api/orders/no-such-order", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found: orders/no-such-order");
}

// ============================================================================
// Status updates
// ============================================================================

#[tokio::test]
async fn test_staff_advances_status() {
    let ctx = TestContext::new().await;
    let id = place_guest_order(&ctx).await;
    let token = ctx.token_for(STAFF_EMAIL).await;

    for status_name in ["preparing", "ready", "completed"] {
        let (status, body) = ctx
            .send(
                Method::PATCH,
                &format!("/api/orders/{id}"),
                Some(&token),
                Some(json!({"status": status_name})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], status_name);
    }
}

#[tokio::test]
async fn test_same_status_update_is_idempotent() {
    let ctx = TestContext::new().await;
    let id = place_guest_order(&ctx).await;
    let token = ctx.token_for(STAFF_EMAIL).await;

    for _ in 0..2 {
        let (status, body) = ctx
            .send(
                Method::PATCH,
                &format!("/api/orders/{id}"),
                Some(&token),
                Some(json!({"status": "pending"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
    }
}

#[tokio::test]
async fn test_backward_and_terminal_transitions_rejected() {
    let ctx = TestContext::new().await;
    let id = place_guest_order(&ctx).await;
    let token = ctx.token_for(STAFF_EMAIL).await;

    let (status, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/orders/{id}"),
            Some(&token),
            Some(json!({"status": "ready"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Backward.
    let (status, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/orders/{id}"),
            Some(&token),
            Some(json!({"status": "preparing"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Cancel from non-terminal is allowed, then the order is frozen.
    let (status, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/orders/{id}"),
            Some(&token),
            Some(json!({"status": "cancelled"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/orders/{id}"),
            Some(&token),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_update_is_management_gated() {
    let ctx = TestContext::new().await;
    let id = place_guest_order(&ctx).await;
    let patch = json!({"status": "preparing"});

    // No token at all.
    let (status, _) = ctx
        .send(Method::PATCH, &format!("/api/orders/{id}"), None, Some(patch.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Regular customer.
    let (_, token) = ctx.signed_up_user("customer").await;
    let (status, body) = ctx
        .send(
            Method::PATCH,
            &format!("/api/orders/{id}"),
            Some(&token),
            Some(patch),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("management"));

    // The order is untouched.
    let (_, fetched) = ctx
        .send(Method::GET, &format!("/api/orders/{id}"), None, None)
        .await;
    assert_eq!(fetched["status"], "pending");
}

// ============================================================================
// Menu
// ============================================================================

#[tokio::test]
async fn test_menu_is_public_and_seeded() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.send(Method::GET, "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.iter().all(|item| item["available"] == true));

    // Single-item read by id.
    let id = items[0]["id"].as_str().unwrap();
    let (status, item) = ctx
        .send(Method::GET, &format!("/api/menu/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["id"], *id);

    let (status, _) = ctx
        .send(Method::GET, "/api/menu/no-such-item", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
