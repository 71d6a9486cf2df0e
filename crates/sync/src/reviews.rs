//! Review moderation manager.
//!
//! Owns review CRUD with ownership/role checks and the order/review
//! cross-reference invariant: for every review with an `orderId`, the
//! referenced order's `hasReview` flag must equal "a non-deleted review
//! references this order".
//!
//! The store offers no cross-document transaction, so the linkage is a
//! two-phase operation: the review write commits first, then the order patch.
//! A failed second phase surfaces as [`SyncError::Integrity`] naming both
//! documents; [`ReviewManager::complete_review_link`] retries the patch
//! alone. The gap is never hidden.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use tableside_core::policy::{Action, authorize};
use tableside_core::review::validate_review_input;
use tableside_core::{OrderId, Principal, Review, ReviewId, UserId};
use tableside_identity::IdentityProvider;
use tableside_store::{Collection, Direction, MemoryStore, Query, collections};

use crate::error::SyncError;
use crate::session::Session;

/// Partial review update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewPatch {
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HasReviewPatch {
    has_review: bool,
}

#[derive(Default)]
struct ReviewLists {
    /// All loaded reviews, most recent first.
    all: Vec<Review>,
    /// The per-user view, when loaded.
    user: Vec<Review>,
}

/// The review moderation manager.
pub struct ReviewManager {
    reviews: Collection,
    orders: Collection,
    identity: IdentityProvider,
    lists: Mutex<ReviewLists>,
}

impl ReviewManager {
    #[must_use]
    pub fn new(store: &MemoryStore, identity: IdentityProvider) -> Self {
        Self {
            reviews: store.collection(collections::REVIEWS),
            orders: store.collection(collections::ORDERS),
            identity,
            lists: Mutex::new(ReviewLists::default()),
        }
    }

    /// Load all reviews, most recent first.
    ///
    /// # Errors
    ///
    /// [`SyncError::Unavailable`] on backend failure.
    pub async fn load_reviews(&self) -> Result<Vec<Review>, SyncError> {
        let docs = self
            .reviews
            .query(&Query::all().order_by("createdAt", Direction::Descending))
            .await?;
        let loaded: Vec<Review> = docs
            .iter()
            .map(tableside_store::Document::deserialize)
            .collect::<Result<_, _>>()?;
        self.lock().all = loaded.clone();
        Ok(loaded)
    }

    /// Load one user's reviews. Same-user-or-admin.
    ///
    /// # Errors
    ///
    /// [`SyncError::Authorization`] for other principals.
    pub async fn load_user_reviews(
        &self,
        session: &Session,
        user: &UserId,
    ) -> Result<Vec<Review>, SyncError> {
        authorize(&session.principal, &Action::ReadUserReviews { user })?;
        self.fresh_token(&session.principal).await?;

        // Single-field filter server-side; the descending sort happens here
        // because the index cannot combine the two.
        let docs = self
            .reviews
            .query(&Query::field_eq("userId", user.as_str()))
            .await?;
        let mut loaded: Vec<Review> = docs
            .iter()
            .map(tableside_store::Document::deserialize)
            .collect::<Result<_, _>>()?;
        loaded.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.lock().user = loaded.clone();
        Ok(loaded)
    }

    /// Create a review.
    ///
    /// Validation happens before any store contact. On success the review is
    /// inserted at the head of the loaded list (the list is most-recent-first,
    /// matching the store's descending-time query). When `order_id` is given,
    /// phase two patches the order's `hasReview`; its failure returns
    /// [`SyncError::Integrity`] with the committed review left in place.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`], [`SyncError::Authentication`],
    /// [`SyncError::Unavailable`], [`SyncError::Integrity`].
    pub async fn create_review(
        &self,
        session: &Session,
        rating: u8,
        comment: &str,
        order_id: Option<OrderId>,
    ) -> Result<Review, SyncError> {
        validate_review_input(rating, comment).map_err(SyncError::Validation)?;
        authorize(&session.principal, &Action::CreateReview)?;
        self.fresh_token(&session.principal).await?;

        let draft = ReviewDraft {
            rating,
            comment,
            order_id: order_id.as_ref(),
            user_id: session.principal.owner_id(),
            username: session.principal.review_username(),
            created_at: Utc::now(),
            is_read: false,
        };
        let doc = self.reviews.add(&draft).await?;
        let review: Review = doc.deserialize()?;

        {
            let mut lists = self.lock();
            lists.all.insert(0, review.clone());
            if !lists.user.is_empty() && lists.user[0].user_id == review.user_id {
                lists.user.insert(0, review.clone());
            }
        }

        if let Some(order_id) = order_id {
            self.patch_order_link(&review.id, &order_id, true).await?;
        }
        Ok(review)
    }

    /// Retry the second half of a failed create: patch the order's
    /// `hasReview` flag for an already-committed review.
    ///
    /// # Errors
    ///
    /// [`SyncError::Integrity`] when the patch fails again.
    pub async fn complete_review_link(
        &self,
        review_id: &ReviewId,
        order_id: &OrderId,
    ) -> Result<(), SyncError> {
        self.patch_order_link(review_id, order_id, true).await
    }

    /// Update a review. Owner or admin.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`], [`SyncError::Authorization`],
    /// [`SyncError::Validation`] for out-of-range patched fields.
    pub async fn update_review(
        &self,
        session: &Session,
        review_id: &ReviewId,
        patch: ReviewPatch,
    ) -> Result<(), SyncError> {
        let existing = self.fetch(review_id).await?;
        authorize(
            &session.principal,
            &Action::UpdateReview { owner: &existing.user_id },
        )?;

        let rating = patch.rating.unwrap_or(existing.rating);
        let comment = patch.comment.as_deref().unwrap_or(&existing.comment);
        validate_review_input(rating, comment).map_err(SyncError::Validation)?;

        self.fresh_token(&session.principal).await?;
        self.reviews.update(review_id.as_str(), &patch).await?;

        let mut lists = self.lock();
        let lists = &mut *lists;
        for list in [&mut lists.all, &mut lists.user] {
            for review in list.iter_mut().filter(|r| r.id == *review_id) {
                if let Some(rating) = patch.rating {
                    review.rating = rating;
                }
                if let Some(comment) = &patch.comment {
                    review.comment.clone_from(comment);
                }
            }
        }
        Ok(())
    }

    /// Delete a review. Owner or admin. When the review referenced an order,
    /// phase two clears the order's `hasReview` flag; its failure surfaces as
    /// [`SyncError::Integrity`] after the delete has committed.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`], [`SyncError::Authorization`],
    /// [`SyncError::Integrity`].
    pub async fn delete_review(
        &self,
        session: &Session,
        review_id: &ReviewId,
    ) -> Result<(), SyncError> {
        let existing = self.fetch(review_id).await?;
        authorize(
            &session.principal,
            &Action::DeleteReview { owner: &existing.user_id },
        )?;
        self.fresh_token(&session.principal).await?;

        self.reviews.delete(review_id.as_str()).await?;

        {
            let mut lists = self.lock();
            lists.all.retain(|r| r.id != *review_id);
            lists.user.retain(|r| r.id != *review_id);
        }

        if let Some(order_id) = &existing.order_id {
            self.patch_order_link(review_id, order_id, false).await?;
        }
        Ok(())
    }

    /// Flip a review's read flag. Management only, independent of ownership.
    ///
    /// # Errors
    ///
    /// [`SyncError::Authorization`], [`SyncError::NotFound`].
    pub async fn mark_review_read(
        &self,
        session: &Session,
        review_id: &ReviewId,
    ) -> Result<(), SyncError> {
        authorize(&session.principal, &Action::MarkReviewRead)?;
        self.fresh_token(&session.principal).await?;

        self.reviews
            .update(review_id.as_str(), &serde_json::json!({"isRead": true}))
            .await?;

        let mut lists = self.lock();
        let lists = &mut *lists;
        for list in [&mut lists.all, &mut lists.user] {
            for review in list.iter_mut().filter(|r| r.id == *review_id) {
                review.is_read = true;
            }
        }
        Ok(())
    }

    /// Mean of the currently-loaded ratings, rounded to one decimal. `0.0`
    /// when nothing is loaded. A view over loaded reviews, not a server
    /// aggregate: callers must not treat it as exact unless the full set is
    /// loaded.
    #[must_use]
    pub fn average_rating(&self) -> f64 {
        let lists = self.lock();
        if lists.all.is_empty() {
            return 0.0;
        }
        let sum: u32 = lists.all.iter().map(|r| u32::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = f64::from(sum) / lists.all.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    /// Snapshot of the loaded reviews, most recent first.
    #[must_use]
    pub fn reviews(&self) -> Vec<Review> {
        self.lock().all.clone()
    }

    /// Snapshot of the loaded per-user reviews.
    #[must_use]
    pub fn user_reviews(&self) -> Vec<Review> {
        self.lock().user.clone()
    }

    async fn fetch(&self, review_id: &ReviewId) -> Result<Review, SyncError> {
        let doc = self
            .reviews
            .get(review_id.as_str())
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("reviews/{review_id}")))?;
        Ok(doc.deserialize()?)
    }

    async fn patch_order_link(
        &self,
        review_id: &ReviewId,
        order_id: &OrderId,
        has_review: bool,
    ) -> Result<(), SyncError> {
        self.orders
            .update(order_id.as_str(), &HasReviewPatch { has_review })
            .await
            .map_err(|err| SyncError::Integrity {
                committed: format!("{}/{review_id}", collections::REVIEWS),
                pending: format!("{}/{order_id}", collections::ORDERS),
                detail: err.to_string(),
            })
    }

    async fn fresh_token(&self, principal: &Principal) -> Result<(), SyncError> {
        if let Some(subject) = principal.subject_id() {
            self.identity
                .issue_token(subject.as_str())
                .await
                .map_err(|err| SyncError::Authentication(err.to_string()))?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ReviewLists> {
        self.lists.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
