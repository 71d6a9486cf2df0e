//! Identity provider errors.

use thiserror::Error;

/// Failure of an identity provider operation.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A credential already exists for this email.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// Email/password pair did not match a credential.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No credential exists for this subject.
    #[error("user not found")]
    UserNotFound,

    /// The token was never issued or has been revoked.
    #[error("invalid token")]
    TokenInvalid,

    /// The token's expiry has passed.
    #[error("token has expired")]
    TokenExpired,

    /// Password hashing failed.
    #[error("password hashing error: {0}")]
    Hash(String),
}

impl From<argon2::password_hash::Error> for IdentityError {
    fn from(err: argon2::password_hash::Error) -> Self {
        match err {
            argon2::password_hash::Error::Password => Self::InvalidCredentials,
            other => Self::Hash(other.to_string()),
        }
    }
}
