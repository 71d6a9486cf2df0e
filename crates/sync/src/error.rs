//! The manager-layer error taxonomy.
//!
//! Every remote-call failure propagates to the caller with enough context to
//! distinguish these kinds. Denials never degrade into empty results.

use thiserror::Error;

use tableside_core::policy::Denial;
use tableside_identity::IdentityError;
use tableside_store::StoreError;

/// Failure of a synchronization-layer operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed input. Never retried automatically.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, expired, or invalid token. Re-authenticate, do not retry.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Valid principal, forbidden action. Never retried.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// The addressed document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient backend failure; safe to retry with backoff.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A two-phase cross-document update committed its first write but could
    /// not complete the second. The caller should retry the pending patch
    /// alone; the committed half is real and must not be rolled back blindly.
    #[error("cross-reference incomplete: {committed} committed, patch of {pending} failed: {detail}")]
    Integrity {
        /// Document that was committed in phase one (`collection/id`).
        committed: String,
        /// Document whose patch is still pending (`collection/id`).
        pending: String,
        detail: String,
    },
}

impl From<Denial> for SyncError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => Self::Authentication("authentication required".to_owned()),
            Denial::Forbidden(reason) => Self::Authorization(reason.to_owned()),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => Self::NotFound(format!("{collection}/{id}")),
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
            other @ (StoreError::Serialization(_) | StoreError::NotAnObject) => {
                Self::Unavailable(other.to_string())
            }
        }
    }
}

impl From<IdentityError> for SyncError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailTaken => Self::Validation(err.to_string()),
            IdentityError::UserNotFound => Self::NotFound("user credential".to_owned()),
            other => Self::Authentication(other.to_string()),
        }
    }
}
