//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; the response body is JSON `{error, details?}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use tableside_core::StatusTransitionError;
use tableside_core::policy::Denial;
use tableside_identity::IdentityError;
use tableside_store::StoreError;

/// Application-level error type for the API service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed request input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, expired, or invalid token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Valid principal, forbidden action.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend store failure; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A two-phase cross-document update committed its first write but could
    /// not complete the second.
    #[error("cross-reference incomplete: {committed} committed, patch of {pending} failed: {detail}")]
    Integrity {
        committed: String,
        pending: String,
        detail: String,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Unavailable(_) | Self::Integrity { .. }) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) | Self::Integrity { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            // The committed half is real; the client retries the pending
            // patch, not the whole operation.
            Self::Integrity {
                committed,
                pending,
                detail,
            } => json!({
                "error": "cross-reference incomplete",
                "details": {
                    "committed": committed,
                    "pending": pending,
                    "detail": detail,
                },
            }),
            // Don't expose internal store details to clients
            Self::Unavailable(_) => json!({"error": "service unavailable"}),
            other => json!({"error": other.to_string()}),
        };

        (status, Json(body)).into_response()
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => Self::Authentication("authentication required".to_owned()),
            Denial::Forbidden(reason) => Self::Authorization(reason.to_owned()),
        }
    }
}

impl From<StoreError> for AppError {
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

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailTaken => Self::Validation(err.to_string()),
            IdentityError::UserNotFound => Self::NotFound("user credential".to_owned()),
            other => Self::Authentication(other.to_string()),
        }
    }
}

impl From<StatusTransitionError> for AppError {
    fn from(err: StatusTransitionError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
