//! Authentication extractors.
//!
//! The token travels as `Authorization: Bearer <token>` with a `?token=`
//! query fallback for clients that cannot set headers. Verification resolves
//! the token into claims and the claims into a [`Principal`] by looking up
//! the profile document; the role comes from the profile, never from the
//! token itself. A missing profile yields the default `user` role.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use tableside_core::{AuthenticatedPrincipal, Principal, Role, UserId, UserRecord};

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that resolves the acting principal, treating a missing token as
/// a guest. A present-but-invalid token is still rejected.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalAuth(principal): OptionalAuth) -> impl IntoResponse {
///     format!("Hello, {}!", principal.review_username())
/// }
/// ```
pub struct OptionalAuth(pub Principal);

/// Extractor that requires an authenticated principal.
pub struct RequireAuth(pub Principal);

/// Extractor that requires a principal with management access.
pub struct RequireManagement(pub Principal);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match extract_token(parts) {
            Some(token) => Ok(Self(resolve_principal(state, &token).await?)),
            None => Ok(Self(Principal::Guest)),
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)
            .ok_or_else(|| AppError::Authentication("authentication required".to_owned()))?;
        Ok(Self(resolve_principal(state, &token).await?))
    }
}

impl FromRequestParts<AppState> for RequireManagement {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(principal) = RequireAuth::from_request_parts(parts, state).await?;
        if principal.has_management_access() {
            Ok(Self(principal))
        } else {
            Err(AppError::Authorization(
                "management access required".to_owned(),
            ))
        }
    }
}

/// Pull the raw token out of the request: `Authorization: Bearer` first,
/// `?token=` second.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION)
        && let Ok(value) = value.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token.to_owned());
    }

    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

/// Verify the token and resolve the full principal.
async fn resolve_principal(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let claims = state.identity().verify_token(token).await?;

    let profile = state
        .users()
        .get(&claims.subject)
        .await?
        .map(|doc| doc.deserialize::<UserRecord>())
        .transpose()?;

    let role = profile.as_ref().map_or(Role::User, |p| p.role);
    let display_name = profile.map_or_else(
        || claims.display_name.clone().unwrap_or_else(|| claims.email.clone()),
        |p| p.username,
    );

    Ok(Principal::Authenticated(AuthenticatedPrincipal {
        subject_id: UserId::new(claims.subject),
        display_name,
        email: claims.email,
        role,
    }))
}
