//! User profile handlers.
//!
//! Profiles mirror credentials held by the identity provider. Mutations that
//! touch both halves run credential-affecting writes in a fixed order and
//! surface a second-half failure as an integrity error instead of leaving the
//! pair silently diverged.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tableside_core::policy::{Action, authorize};
use tableside_core::{Principal, Role, UserId, UserRecord};
use tableside_store::{Query, collections};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub role: Option<Role>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDraft<'a> {
    username: &'a str,
    email: &'a str,
    role: Role,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ProfilePatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
}

/// `POST /api/users` - registration completion: write the profile document
/// for the acting principal's own credential. Assigning a non-default role is
/// admin-only.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRecord>)> {
    authorize(&principal, &Action::CreateUser)?;

    let role = body.role.unwrap_or_default();
    if role != Role::User {
        authorize(&principal, &Action::AssignRole)?;
    }

    let Principal::Authenticated(actor) = &principal else {
        return Err(AppError::Authentication("authentication required".to_owned()));
    };
    if body.username.trim().is_empty() {
        return Err(AppError::Validation("username must not be empty".to_owned()));
    }

    let created_at = Utc::now();
    state
        .users()
        .set(
            actor.subject_id.as_str(),
            &ProfileDraft {
                username: &body.username,
                email: &actor.email,
                role,
                created_at,
            },
        )
        .await?;
    tracing::info!(user_id = %actor.subject_id, "profile created");

    let record = UserRecord {
        id: actor.subject_id.clone(),
        username: body.username,
        email: actor.email.clone(),
        role,
        created_at,
    };
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/users` - every profile. Management only.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Vec<UserRecord>>> {
    authorize(&principal, &Action::ListUsers)?;

    let docs = state.users().query(&Query::all()).await?;
    let records = docs
        .iter()
        .map(tableside_store::Document::deserialize)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Json(records))
}

/// `GET /api/users/{id}` - read a profile. Self or management.
pub async fn get_user(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<UserRecord>> {
    let user = UserId::new(id);
    authorize(&principal, &Action::ReadUser { user: &user })?;

    let doc = state
        .users()
        .get(user.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{user}", collections::USERS)))?;
    Ok(Json(doc.deserialize()?))
}

/// `PATCH /api/users/{id}` - update profile fields. Self or admin; role
/// changes are admin-only. A username change is mirrored into the identity
/// provider's display name, and a mirror failure is surfaced as an integrity
/// error with the profile half already committed.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserRecord>> {
    let user = UserId::new(id);
    authorize(&principal, &Action::UpdateUser { user: &user })?;
    if body.role.is_some() {
        authorize(&principal, &Action::AssignRole)?;
    }

    let doc = state
        .users()
        .get(user.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{user}", collections::USERS)))?;
    let mut record: UserRecord = doc.deserialize()?;

    if let Some(username) = &body.username
        && username.trim().is_empty()
    {
        return Err(AppError::Validation("username must not be empty".to_owned()));
    }

    state
        .users()
        .update(
            user.as_str(),
            &ProfilePatch {
                username: body.username.as_deref(),
                role: body.role,
            },
        )
        .await?;

    if let Some(username) = &body.username {
        state
            .identity()
            .update_display_name(user.as_str(), username)
            .await
            .map_err(|err| AppError::Integrity {
                committed: format!("{}/{user}", collections::USERS),
                pending: format!("credential/{user}"),
                detail: err.to_string(),
            })?;
        record.username.clone_from(username);
    }
    if let Some(role) = body.role {
        record.role = role;
    }
    Ok(Json(record))
}

/// `DELETE /api/users/{id}` - remove the credential, then the profile. Admin
/// only. A profile-delete failure after the credential is gone is surfaced as
/// an integrity error.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    authorize(&principal, &Action::DeleteUser)?;

    let user = UserId::new(id);
    state.identity().delete_user(user.as_str()).await?;
    state
        .users()
        .delete(user.as_str())
        .await
        .map_err(|err| AppError::Integrity {
            committed: format!("credential/{user}"),
            pending: format!("{}/{user}", collections::USERS),
            detail: err.to_string(),
        })?;

    tracing::info!(user_id = %user, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
