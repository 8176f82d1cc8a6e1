use axum::{Json, extract::State, http::StatusCode};
use halaqa_core::{
    authz::Action,
    errors::HalaqaError,
    models::user::{ChangePasswordRequest, UpdateProfileRequest, User},
};
use halaqa_db::repositories::UserChanges;
use std::sync::Arc;

use crate::{
    ApiState,
    handlers::{require, users::normalize_email},
    middleware::{
        auth::{AuthUser, hash_password, verify_password},
        error_handling::AppError,
        extract::AppJson,
    },
};

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppJson(mut payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    require(&auth.actor, Action::UpdateProfile, Some(auth.user.id))?;

    payload.email = normalize_email(payload.email);
    payload.validate()?;

    if let Some(email) = &payload.email {
        if state.repos.users.email_taken(email, Some(auth.user.id)).await? {
            return Err(HalaqaError::Conflict("Email is already in use".to_string()).into());
        }
    }

    let changes = UserChanges {
        name: payload.name.map(|name| name.trim().to_string()),
        email: payload.email,
        profile: payload.profile,
        ..UserChanges::default()
    };

    let user = state
        .repos
        .users
        .update_user(auth.user.id, changes)
        .await?
        .ok_or_else(|| HalaqaError::Authentication("Invalid authorization token".to_string()))?;

    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn change_password(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    require(&auth.actor, Action::UpdateProfile, Some(auth.user.id))?;
    payload.validate()?;

    let current_hash = state
        .repos
        .users
        .get_password_hash(auth.user.id)
        .await?
        .ok_or_else(|| HalaqaError::Authentication("Invalid authorization token".to_string()))?;

    if !verify_password(&payload.current_password, &current_hash)? {
        return Err(HalaqaError::invalid_field("currentPassword", "is incorrect").into());
    }

    let changes = UserChanges {
        password_hash: Some(hash_password(&payload.new_password)?),
        ..UserChanges::default()
    };
    state.repos.users.update_user(auth.user.id, changes).await?;

    tracing::info!("User {} changed their password", auth.user.id);
    Ok(StatusCode::NO_CONTENT)
}
