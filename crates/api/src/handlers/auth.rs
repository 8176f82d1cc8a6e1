use axum::{Json, extract::State};
use halaqa_core::{
    errors::HalaqaError,
    models::user::{LoginRequest, LoginResponse, User},
};
use std::sync::Arc;

use crate::{
    ApiState,
    middleware::{
        auth::{AuthUser, issue_token, verify_password},
        error_handling::AppError,
        extract::AppJson,
    },
};

fn invalid_credentials() -> AppError {
    AppError(HalaqaError::Authentication("Invalid username or password".to_string()))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let Some(credentials) = state.repos.users.get_credentials(payload.username.trim()).await? else {
        tracing::debug!("Login for unknown user");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &credentials.password_hash)? {
        tracing::debug!("Wrong password for user {}", credentials.user.id);
        return Err(invalid_credentials());
    }

    let access_token = issue_token(&credentials.user, &state.auth)?;
    tracing::info!("User {} logged in", credentials.user.id);

    Ok(Json(LoginResponse {
        access_token,
        user: credentials.user,
    }))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}
