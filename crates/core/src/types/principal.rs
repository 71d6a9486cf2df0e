//! The acting principal.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::role::Role;

/// Username stamped on reviews written without an authenticated session.
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// A fully resolved authenticated principal.
///
/// The role is resolved exactly once, at session start, from the profile
/// document; it is never probed out of loosely-typed claims afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedPrincipal {
    pub subject_id: UserId,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

/// The actor performing an action: either an unauthenticated guest or an
/// authenticated principal with a non-nullable role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Principal {
    Guest,
    Authenticated(AuthenticatedPrincipal),
}

impl Principal {
    /// The role carried by the principal, if authenticated.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::Guest => None,
            Self::Authenticated(p) => Some(p.role),
        }
    }

    /// The subject ID, if authenticated.
    #[must_use]
    pub const fn subject_id(&self) -> Option<&UserId> {
        match self {
            Self::Guest => None,
            Self::Authenticated(p) => Some(&p.subject_id),
        }
    }

    /// The owner ID to stamp on documents this principal creates.
    #[must_use]
    pub fn owner_id(&self) -> UserId {
        match self {
            Self::Guest => UserId::guest(),
            Self::Authenticated(p) => p.subject_id.clone(),
        }
    }

    /// The username to stamp on reviews this principal writes. Never
    /// client-supplied.
    #[must_use]
    pub fn review_username(&self) -> &str {
        match self {
            Self::Guest => ANONYMOUS_USERNAME,
            Self::Authenticated(p) => &p.display_name,
        }
    }

    /// Whether the principal is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the principal's role carries management access.
    #[must_use]
    pub fn has_management_access(&self) -> bool {
        self.role().is_some_and(Role::has_management_access)
    }

    /// Whether the principal is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Whether the principal is exactly this subject.
    #[must_use]
    pub fn is_subject(&self, user: &UserId) -> bool {
        self.subject_id() == Some(user)
    }
}
