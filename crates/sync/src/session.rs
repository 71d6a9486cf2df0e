//! Session resolution.
//!
//! Credentials resolve into an explicit [`Session`] object that callers pass
//! to every manager operation. There is no ambient "current user": the
//! principal travels with the call.
//!
//! Management accounts are not a special login path. They are seeded through
//! the normal credential store at startup ([`SessionResolver::seed_accounts`]),
//! after which every login takes the same route: identity sign-in, token
//! verification, then a profile-document lookup for the role.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use tableside_core::{AuthenticatedPrincipal, Principal, Role, UserId, UserRecord};
use tableside_identity::{IdToken, IdentityProvider};
use tableside_store::{Collection, MemoryStore, collections};

use crate::error::SyncError;
use crate::storage::{LocalStorage, snapshot_keys};

/// Login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A resolved session: the acting principal plus the token issued at login.
///
/// The login token is informational; privileged calls never reuse it, they
/// fetch a fresh token per call. Restored sessions carry no token at all.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub token: Option<IdToken>,
}

impl Session {
    /// An unauthenticated session.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            principal: Principal::Guest,
            token: None,
        }
    }
}

/// An account seeded at startup (management bootstrap).
#[derive(Debug, Clone)]
pub struct BootstrapAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Resolves credentials and snapshots into sessions.
pub struct SessionResolver {
    identity: IdentityProvider,
    users: Collection,
    storage: Arc<dyn LocalStorage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDraft<'a> {
    username: &'a str,
    email: &'a str,
    role: Role,
    created_at: chrono::DateTime<Utc>,
}

impl SessionResolver {
    #[must_use]
    pub fn new(
        store: &MemoryStore,
        identity: IdentityProvider,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        Self {
            identity,
            users: store.collection(collections::USERS),
            storage,
        }
    }

    /// Seed accounts through the normal credential path. Existing emails are
    /// left untouched, so seeding is idempotent across restarts.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unavailable`] when a profile write fails.
    pub async fn seed_accounts(&self, accounts: &[BootstrapAccount]) -> Result<(), SyncError> {
        for account in accounts {
            let uid = match self
                .identity
                .create_user(&account.email, &account.password, Some(&account.username))
                .await
            {
                Ok(uid) => uid,
                Err(tableside_identity::IdentityError::EmailTaken) => continue,
                Err(other) => return Err(other.into()),
            };
            self.users
                .set(
                    &uid,
                    &ProfileDraft {
                        username: &account.username,
                        email: &account.email,
                        role: account.role,
                        created_at: Utc::now(),
                    },
                )
                .await?;
            tracing::info!(username = %account.username, role = %account.role, "seeded account");
        }
        Ok(())
    }

    /// Register a new user: credential first, then the mirrored profile
    /// document, then a resolved session.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] for taken emails and
    /// [`SyncError::Integrity`] when the credential committed but the profile
    /// write failed (retry [`Self::complete_profile`] to repair the mirror).
    pub async fn register(
        &self,
        credentials: &Credentials,
        username: &str,
    ) -> Result<Session, SyncError> {
        let uid = self
            .identity
            .create_user(&credentials.email, &credentials.password, Some(username))
            .await?;

        self.complete_profile(&uid, username, &credentials.email, Role::User)
            .await?;
        self.resolve_session(credentials).await
    }

    /// Write the profile half of the credential/profile mirror. Phase two of
    /// registration; retryable on its own.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Integrity`] naming the committed credential when
    /// the profile write fails.
    pub async fn complete_profile(
        &self,
        uid: &str,
        username: &str,
        email: &str,
        role: Role,
    ) -> Result<(), SyncError> {
        self.users
            .set(
                uid,
                &ProfileDraft {
                    username,
                    email,
                    role,
                    created_at: Utc::now(),
                },
            )
            .await
            .map_err(|err| SyncError::Integrity {
                committed: format!("credential/{uid}"),
                pending: format!("{}/{uid}", collections::USERS),
                detail: err.to_string(),
            })
    }

    /// Resolve credentials into a session: sign in, verify the token, look up
    /// the profile document for the role (default `user` when absent), then
    /// persist the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Authentication`] for bad credentials or token
    /// verification failure.
    pub async fn resolve_session(&self, credentials: &Credentials) -> Result<Session, SyncError> {
        let token = self
            .identity
            .sign_in(&credentials.email, &credentials.password)
            .await?;
        let claims = self.identity.verify_token(token.as_str()).await?;

        let profile = self
            .users
            .get(&claims.subject)
            .await?
            .map(|doc| doc.deserialize::<UserRecord>())
            .transpose()?;

        let role = profile.as_ref().map_or(Role::User, |p| p.role);
        let display_name = profile.map_or_else(
            || claims.display_name.clone().unwrap_or_else(|| claims.email.clone()),
            |p| p.username,
        );

        let principal = Principal::Authenticated(AuthenticatedPrincipal {
            subject_id: UserId::new(claims.subject),
            display_name,
            email: claims.email,
            role,
        });
        self.persist(&principal)?;

        Ok(Session {
            principal,
            token: Some(token),
        })
    }

    /// Rebuild a session from the persisted snapshot without contacting the
    /// network. The result is for instant UI resume only; it carries no token
    /// and confers no server-side trust.
    #[must_use]
    pub fn restore(&self) -> Option<Session> {
        if self.storage.get(snapshot_keys::IS_AUTHENTICATED)? != "true" {
            return None;
        }
        let raw = self.storage.get(snapshot_keys::USER)?;
        let principal: Principal = serde_json::from_str(&raw).ok()?;
        principal.is_authenticated().then(|| Session {
            principal,
            token: None,
        })
    }

    /// Clear the persisted snapshot. Callers must drop any live subscription
    /// feeds *before* calling this, so a late push cannot repopulate state
    /// after logout.
    pub fn logout(&self) {
        self.storage.remove(snapshot_keys::USER);
        self.storage.remove(snapshot_keys::PENDING_ORDERS);
        self.storage.set(snapshot_keys::IS_AUTHENTICATED, "false");
    }

    fn persist(&self, principal: &Principal) -> Result<(), SyncError> {
        let raw = serde_json::to_string(principal)
            .map_err(|err| SyncError::Unavailable(err.to_string()))?;
        self.storage.set(snapshot_keys::USER, &raw);
        self.storage.set(snapshot_keys::IS_AUTHENTICATED, "true");
        Ok(())
    }
}
