//! Store error types.

use thiserror::Error;

/// Failure of a document store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Transient backend failure. Writes are idempotent-by-id or additive,
    /// so callers may retry with backoff.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Document data could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document payloads must be JSON objects.
    #[error("document data must be a JSON object")]
    NotAnObject,
}

impl StoreError {
    /// Whether a retry with backoff may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
