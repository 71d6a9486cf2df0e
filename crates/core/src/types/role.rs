//! Principal roles.

use serde::{Deserialize, Serialize};

/// Role assigned to a user record.
///
/// Staff, managers, and admins share "management access": the ability to
/// advance order statuses and moderate review read-flags. Only admins may
/// act on documents they do not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Staff,
    Manager,
    Admin,
}

impl Role {
    /// Whether this role carries management access.
    #[must_use]
    pub const fn has_management_access(self) -> bool {
        matches!(self, Self::Staff | Self::Manager | Self::Admin)
    }

    /// Parse a role from its wire name, defaulting to `User` for anything
    /// unrecognized (profile documents are schema-flexible).
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "staff" => Self::Staff,
            "manager" => Self::Manager,
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    /// The wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Staff => "staff",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
