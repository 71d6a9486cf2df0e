//! Authorization policy.
//!
//! A single pure function maps (principal, action) to allow or deny. Every
//! privileged layer - the HTTP API and the client-side managers - calls the
//! same function, so the rules live in exactly one place. Denials are always
//! surfaced as explicit errors, never as silently filtered results.

use thiserror::Error;

use crate::types::{Principal, UserId};

/// An action a principal may attempt, with the resource context the rules
/// need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    ReadMenu,
    ReadReviews,
    ReadOrder,
    /// Guest-allowed; the resulting order is owned by the acting principal's
    /// subject id or the guest sentinel.
    CreateOrder,
    UpdateOrderStatus,
    /// Guest-allowed; the review username is forced server-side.
    CreateReview,
    UpdateReview { owner: &'a UserId },
    DeleteReview { owner: &'a UserId },
    MarkReviewRead,
    ReadUserReviews { user: &'a UserId },
    CreateUser,
    ListUsers,
    ReadUser { user: &'a UserId },
    UpdateUser { user: &'a UserId },
    /// Changing a record's role, as opposed to profile fields.
    AssignRole,
    DeleteUser,
}

/// A denied action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    /// The action needs an authenticated principal and none was supplied.
    #[error("authentication required")]
    Unauthenticated,
    /// The principal is authenticated but the action is forbidden.
    #[error("{0}")]
    Forbidden(&'static str),
}

/// Decide whether `principal` may perform `action`.
///
/// # Errors
///
/// Returns [`Denial::Unauthenticated`] when the action requires a session and
/// the principal is a guest, [`Denial::Forbidden`] when a valid principal
/// lacks the required role or ownership.
pub fn authorize(principal: &Principal, action: &Action<'_>) -> Result<(), Denial> {
    match action {
        Action::ReadMenu
        | Action::ReadReviews
        | Action::ReadOrder
        | Action::CreateOrder
        | Action::CreateReview => Ok(()),

        Action::UpdateOrderStatus | Action::MarkReviewRead | Action::ListUsers => {
            require_management(principal)
        }

        Action::UpdateReview { owner } | Action::DeleteReview { owner } => {
            require_authenticated(principal)?;
            if principal.is_subject(owner) || principal.is_admin() {
                Ok(())
            } else {
                Err(Denial::Forbidden("not authorized"))
            }
        }

        Action::ReadUserReviews { user } => {
            require_authenticated(principal)?;
            if principal.is_subject(user) || principal.is_admin() {
                Ok(())
            } else {
                Err(Denial::Forbidden("not authorized"))
            }
        }

        Action::CreateUser => require_authenticated(principal),

        Action::ReadUser { user } => {
            require_authenticated(principal)?;
            if principal.is_subject(user) || principal.has_management_access() {
                Ok(())
            } else {
                Err(Denial::Forbidden("not authorized"))
            }
        }

        Action::UpdateUser { user } => {
            require_authenticated(principal)?;
            if principal.is_subject(user) || principal.is_admin() {
                Ok(())
            } else {
                Err(Denial::Forbidden("not authorized"))
            }
        }

        Action::AssignRole | Action::DeleteUser => {
            require_authenticated(principal)?;
            if principal.is_admin() {
                Ok(())
            } else {
                Err(Denial::Forbidden("admin access required"))
            }
        }
    }
}

fn require_authenticated(principal: &Principal) -> Result<(), Denial> {
    if principal.is_authenticated() {
        Ok(())
    } else {
        Err(Denial::Unauthenticated)
    }
}

fn require_management(principal: &Principal) -> Result<(), Denial> {
    require_authenticated(principal)?;
    if principal.has_management_access() {
        Ok(())
    } else {
        Err(Denial::Forbidden("management access required"))
    }
}
