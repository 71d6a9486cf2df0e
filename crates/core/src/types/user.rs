//! User profile documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::role::Role;

/// A user profile document.
///
/// The profile is one half of a mirrored pair: the identity provider holds
/// the credential (email, password hash, display name), the store holds this
/// document (role and profile fields). Writes that touch both must surface a
/// failure of the second half instead of leaving the pair diverged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
