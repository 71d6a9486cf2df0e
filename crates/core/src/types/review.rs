//! Review documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ReviewId, UserId};

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;
/// Minimum review comment length in characters.
pub const MIN_COMMENT_CHARS: usize = 10;

/// A review document.
///
/// `username` is stamped by the server from the acting principal, never taken
/// from the client. When `order_id` is set, the referenced order's
/// `hasReview` flag must agree; that linkage is a two-phase update owned by
/// the review moderation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub rating: u8,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub user_id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// Validate a (rating, comment) pair before any remote write.
///
/// # Errors
///
/// Returns a human-readable reason when the rating is outside `1..=5` or the
/// comment is shorter than [`MIN_COMMENT_CHARS`] characters.
pub fn validate_review_input(rating: u8, comment: &str) -> Result<(), String> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        ));
    }
    if comment.chars().count() < MIN_COMMENT_CHARS {
        return Err(format!(
            "comment must be at least {MIN_COMMENT_CHARS} characters"
        ));
    }
    Ok(())
}
