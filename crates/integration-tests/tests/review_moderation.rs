//! Integration tests for review posting, moderation, and the order/review
//! cross-reference.

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use tableside_integration_tests::{ADMIN_EMAIL, STAFF_EMAIL, TestContext};

async fn place_guest_order(ctx: &TestContext) -> String {
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/orders",
            None,
            Some(json!({
                "items": [{"name": "Caesar Salad", "qty": 1}],
                "totalAmount": "7.50",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

async fn order_has_review(ctx: &TestContext, order_id: &str) -> bool {
    let (status, body) = ctx
        .send(Method::GET, &format!("/api/orders/{order_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    body["hasReview"] == true
}

fn review_body(rating: u8, comment: &str) -> Value {
    json!({"rating": rating, "comment": comment})
}

// ============================================================================
// Posting
// ============================================================================

#[tokio::test]
async fn test_guest_review_is_anonymous() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            None,
            Some(review_body(5, "Wonderful food and atmosphere")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "Anonymous");
    assert_eq!(body["userId"], "guest");
    assert_eq!(body["isRead"], false);
}

#[tokio::test]
async fn test_username_is_forced_server_side() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.signed_up_user("honest-reviewer").await;

    // A spoofed username field in the body is ignored.
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            Some(&token),
            Some(json!({
                "rating": 4,
                "comment": "Solid meal, would come back",
                "username": "someone-else",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "honest-reviewer");
}

#[tokio::test]
async fn test_reviews_listed_most_recent_first() {
    let ctx = TestContext::new().await;
    for comment in ["The first of the reviews", "The second of the reviews"] {
        let (status, _) = ctx
            .send(Method::POST, "/api/reviews", None, Some(review_body(4, comment)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx.send(Method::GET, "/api/reviews", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let reviews = body.as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0]["comment"], "The second of the reviews");
    assert_eq!(reviews[1]["comment"], "The first of the reviews");
}

#[tokio::test]
async fn test_review_validation() {
    let ctx = TestContext::new().await;
    for (rating, comment) in [(0, "long enough comment here"), (6, "long enough comment here"), (3, "short")] {
        let (status, _) = ctx
            .send(Method::POST, "/api/reviews", None, Some(review_body(rating, comment)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, body) = ctx.send(Method::GET, "/api/reviews", None, None).await;
    assert!(body.as_array().unwrap().is_empty());
}

// ============================================================================
// Order linkage
// ============================================================================

#[tokio::test]
async fn test_linked_review_flips_has_review() {
    let ctx = TestContext::new().await;
    let order_id = place_guest_order(&ctx).await;
    assert!(!order_has_review(&ctx, &order_id).await);

    let (status, review) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            None,
            Some(json!({
                "rating": 5,
                "comment": "Review of a real order",
                "orderId": order_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(order_has_review(&ctx, &order_id).await);

    // Deleting the review clears the flag again.
    let admin = ctx.token_for(ADMIN_EMAIL).await;
    let review_id = review["id"].as_str().unwrap();
    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/reviews/{review_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!order_has_review(&ctx, &order_id).await);
}

#[tokio::test]
async fn test_link_failure_surfaces_committed_review() {
    let ctx = TestContext::new().await;
    let order_id = place_guest_order(&ctx).await;

    // The review write succeeds; the order patch fails.
    ctx.store.inject_write_failures("orders", 1);
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            None,
            Some(json!({
                "rating": 4,
                "comment": "Partial failure scenario",
                "orderId": order_id,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "cross-reference incomplete");
    let committed = body["details"]["committed"].as_str().unwrap();
    assert!(committed.starts_with("reviews/"));
    assert_eq!(
        body["details"]["pending"],
        format!("orders/{order_id}")
    );

    // The committed half is real: the review is listed, the flag is not set.
    let (_, reviews) = ctx.send(Method::GET, "/api/reviews", None, None).await;
    assert_eq!(reviews.as_array().unwrap().len(), 1);
    assert!(!order_has_review(&ctx, &order_id).await);
}

// ============================================================================
// Moderation
// ============================================================================

#[tokio::test]
async fn test_only_owner_or_admin_may_edit() {
    let ctx = TestContext::new().await;
    let (_, owner) = ctx.signed_up_user("owner").await;
    let (_, intruder) = ctx.signed_up_user("intruder").await;

    let (_, review) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            Some(&owner),
            Some(review_body(2, "Disappointing on the night")),
        )
        .await;
    let review_id = review["id"].as_str().unwrap();
    let uri = format!("/api/reviews/{review_id}");

    // Intruder and staff both get a 403; staff is not admin.
    let staff = ctx.token_for(STAFF_EMAIL).await;
    for token in [&intruder, &staff] {
        let (status, _) = ctx
            .send(Method::PATCH, &uri, Some(token), Some(json!({"rating": 5})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = ctx.send(Method::DELETE, &uri, Some(token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // Owner edit goes through and is re-validated.
    let (status, _) = ctx
        .send(Method::PATCH, &uri, Some(&owner), Some(json!({"rating": 9})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = ctx
        .send(Method::PATCH, &uri, Some(&owner), Some(json!({"rating": 4})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating"], 4);
}

#[tokio::test]
async fn test_mark_read_is_management_only() {
    let ctx = TestContext::new().await;
    let (_, owner) = ctx.signed_up_user("writer").await;

    let (_, review) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            Some(&owner),
            Some(review_body(5, "Please read this one soon")),
        )
        .await;
    let uri = format!("/api/reviews/{}/read", review["id"].as_str().unwrap());

    let (status, _) = ctx.send(Method::PATCH, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let staff = ctx.token_for(STAFF_EMAIL).await;
    let (status, _) = ctx.send(Method::PATCH, &uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, reviews) = ctx.send(Method::GET, "/api/reviews", None, None).await;
    assert_eq!(reviews[0]["isRead"], true);
}

#[tokio::test]
async fn test_user_review_listing_is_gated() {
    let ctx = TestContext::new().await;
    let (uid, owner) = ctx.signed_up_user("prolific").await;
    let (_, other) = ctx.signed_up_user("nosy").await;

    ctx.send(
        Method::POST,
        "/api/reviews",
        Some(&owner),
        Some(review_body(5, "Writing under my own account")),
    )
    .await;

    let uri = format!("/api/reviews/user/{uid}");

    let (status, _) = ctx.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.send(Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.send(Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let admin = ctx.token_for(ADMIN_EMAIL).await;
    let (status, _) = ctx.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}
