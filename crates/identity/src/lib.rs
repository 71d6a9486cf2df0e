//! Tableside Identity - identity provider boundary.
//!
//! The platform consumes its authentication provider through a narrow
//! surface: create/update/delete a credential, sign in for a token, and
//! "verify token, get claims". This crate defines that surface and ships an
//! in-process implementation: argon2-hashed credentials and opaque expiring
//! tokens held server-side.
//!
//! Tokens are deliberately short-lived and never cached by callers; every
//! privileged operation fetches a fresh one immediately before the call.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod error;

pub use error::IdentityError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// Default token lifetime.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// An issued identity token. Opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdToken(String);

impl IdToken {
    /// The raw token string, as sent in the `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Claims carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Stable subject ID of the principal.
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

struct CredentialRecord {
    email: String,
    display_name: Option<String>,
    password_hash: String,
}

struct IssuedToken {
    subject: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    credentials: HashMap<String, CredentialRecord>,
    uid_by_email: HashMap<String, String>,
    tokens: HashMap<String, IssuedToken>,
}

/// In-process identity provider. Cheap to clone.
#[derive(Clone)]
pub struct IdentityProvider {
    inner: Arc<Mutex<Inner>>,
    token_ttl: Duration,
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_token_ttl(Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    /// Provider with a custom token lifetime. A zero TTL makes every issued
    /// token already expired, which the expiry tests use.
    #[must_use]
    pub fn with_token_ttl(token_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            token_ttl,
        }
    }

    /// Create a credential and return the new subject ID.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmailTaken`] when a credential already exists
    /// for the email, [`IdentityError::Hash`] on hashing failure.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, IdentityError> {
        let password_hash = hash_password(password)?;
        let uid = random_id();
        let mut inner = self.lock();
        if inner.uid_by_email.contains_key(email) {
            return Err(IdentityError::EmailTaken);
        }
        inner.uid_by_email.insert(email.to_owned(), uid.clone());
        inner.credentials.insert(
            uid.clone(),
            CredentialRecord {
                email: email.to_owned(),
                display_name: display_name.map(str::to_owned),
                password_hash,
            },
        );
        tracing::debug!(subject = %uid, "credential created");
        Ok(uid)
    }

    /// Verify an email/password pair and issue a token.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredentials`] when the pair does not
    /// match.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdToken, IdentityError> {
        let mut inner = self.lock();
        let uid = inner
            .uid_by_email
            .get(email)
            .cloned()
            .ok_or(IdentityError::InvalidCredentials)?;
        let hash = inner
            .credentials
            .get(&uid)
            .map(|c| c.password_hash.clone())
            .ok_or(IdentityError::InvalidCredentials)?;

        verify_password(password, &hash)?;
        Ok(Self::issue_locked(&mut inner, &uid, self.token_ttl))
    }

    /// Issue a fresh token for an existing subject.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UserNotFound`] for unknown subjects.
    pub async fn issue_token(&self, subject: &str) -> Result<IdToken, IdentityError> {
        let mut inner = self.lock();
        if !inner.credentials.contains_key(subject) {
            return Err(IdentityError::UserNotFound);
        }
        Ok(Self::issue_locked(&mut inner, subject, self.token_ttl))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::TokenInvalid`] for unknown or revoked tokens
    /// and [`IdentityError::TokenExpired`] past the expiry.
    pub async fn verify_token(&self, token: &str) -> Result<Claims, IdentityError> {
        let inner = self.lock();
        let issued = inner.tokens.get(token).ok_or(IdentityError::TokenInvalid)?;
        if issued.expires_at < Utc::now() {
            return Err(IdentityError::TokenExpired);
        }
        let credential = inner
            .credentials
            .get(&issued.subject)
            .ok_or(IdentityError::TokenInvalid)?;
        Ok(Claims {
            subject: issued.subject.clone(),
            email: credential.email.clone(),
            display_name: credential.display_name.clone(),
            expires_at: issued.expires_at,
        })
    }

    /// Update the display name on a credential.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UserNotFound`] for unknown subjects.
    pub async fn update_display_name(
        &self,
        subject: &str,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let mut inner = self.lock();
        let credential = inner
            .credentials
            .get_mut(subject)
            .ok_or(IdentityError::UserNotFound)?;
        credential.display_name = Some(display_name.to_owned());
        Ok(())
    }

    /// Replace the password on a credential.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UserNotFound`] for unknown subjects,
    /// [`IdentityError::Hash`] on hashing failure.
    pub async fn update_password(
        &self,
        subject: &str,
        password: &str,
    ) -> Result<(), IdentityError> {
        let password_hash = hash_password(password)?;
        let mut inner = self.lock();
        let credential = inner
            .credentials
            .get_mut(subject)
            .ok_or(IdentityError::UserNotFound)?;
        credential.password_hash = password_hash;
        Ok(())
    }

    /// Delete a credential and revoke every token issued to it.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UserNotFound`] for unknown subjects.
    pub async fn delete_user(&self, subject: &str) -> Result<(), IdentityError> {
        let mut inner = self.lock();
        let credential = inner
            .credentials
            .remove(subject)
            .ok_or(IdentityError::UserNotFound)?;
        inner.uid_by_email.remove(&credential.email);
        inner.tokens.retain(|_, issued| issued.subject != subject);
        tracing::debug!(%subject, "credential deleted");
        Ok(())
    }

    fn issue_locked(inner: &mut Inner, subject: &str, ttl: Duration) -> IdToken {
        let token = random_id();
        inner.tokens.insert(
            token.clone(),
            IssuedToken {
                subject: subject.to_owned(),
                expires_at: Utc::now() + ttl,
            },
        );
        IdToken(token)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<(), IdentityError> {
    let parsed = PasswordHash::new(stored)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| IdentityError::InvalidCredentials)
}

fn random_id() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_sign_in_verify() {
        let identity = IdentityProvider::new();
        let uid = identity
            .create_user("alice@example.com", "s3cret-pass", Some("alice"))
            .await
            .unwrap();

        let token = identity
            .sign_in("alice@example.com", "s3cret-pass")
            .await
            .unwrap();
        let claims = identity.verify_token(token.as_str()).await.unwrap();
        assert_eq!(claims.subject, uid);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.display_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let identity = IdentityProvider::new();
        identity
            .create_user("bob@example.com", "right-password", None)
            .await
            .unwrap();
        let err = identity
            .sign_in("bob@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let identity = IdentityProvider::new();
        identity
            .create_user("carol@example.com", "password-one", None)
            .await
            .unwrap();
        let err = identity
            .create_user("carol@example.com", "password-two", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let identity = IdentityProvider::with_token_ttl(Duration::zero());
        let uid = identity
            .create_user("dan@example.com", "some-password", None)
            .await
            .unwrap();
        let token = identity.issue_token(&uid).await.unwrap();
        let err = identity.verify_token(token.as_str()).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenExpired));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let identity = IdentityProvider::new();
        let err = identity.verify_token("garbage").await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_delete_revokes_tokens() {
        let identity = IdentityProvider::new();
        let uid = identity
            .create_user("eve@example.com", "some-password", None)
            .await
            .unwrap();
        let token = identity.issue_token(&uid).await.unwrap();

        identity.delete_user(&uid).await.unwrap();

        let err = identity.verify_token(token.as_str()).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenInvalid));
        // Email is free again.
        identity
            .create_user("eve@example.com", "another-password", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_display_name_update_visible_in_claims() {
        let identity = IdentityProvider::new();
        let uid = identity
            .create_user("fred@example.com", "some-password", Some("fred"))
            .await
            .unwrap();
        identity.update_display_name(&uid, "Frederick").await.unwrap();
        let token = identity.issue_token(&uid).await.unwrap();
        let claims = identity.verify_token(token.as_str()).await.unwrap();
        assert_eq!(claims.display_name.as_deref(), Some("Frederick"));
    }
}
