use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use halaqa_core::{
    authz::Action,
    errors::HalaqaError,
    models::{
        common::{Page, PageRequest},
        group::GroupFilter,
        user::{CreateUserRequest, Role, UpdateUserRequest, User, UserFilter},
    },
};
use halaqa_db::repositories::{NewUser, UserChanges};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    handlers::require,
    middleware::{
        auth::{AuthUser, hash_password},
        error_handling::AppError,
        extract::{AppJson, AppQuery},
    },
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Blank emails are stored as absent.
pub(crate) fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

async fn ensure_unique(
    state: &ApiState,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    if let Some(username) = username {
        if state.repos.users.username_taken(username, except).await? {
            return Err(HalaqaError::Conflict(format!("Username {username} is already taken")).into());
        }
    }
    if let Some(email) = email {
        if state.repos.users.email_taken(email, except).await? {
            return Err(HalaqaError::Conflict("Email is already in use".to_string()).into());
        }
    }
    Ok(())
}

/// A tutor of record must stay able to lead, and a rostered student must
/// stay a student.
async fn ensure_role_change_keeps_groups(
    state: &ApiState,
    existing: &User,
    role: Role,
) -> Result<(), AppError> {
    if !role.can_lead_group() {
        let tutored = state
            .repos
            .groups
            .all_groups(&GroupFilter {
                tutor_id: Some(existing.id),
                ..GroupFilter::default()
            })
            .await?;
        if !tutored.is_empty() {
            return Err(HalaqaError::Conflict(format!(
                "User still tutors {} group(s); reassign them before changing the role",
                tutored.len()
            ))
            .into());
        }
    }

    if existing.role == Role::Student {
        let enrolled = state
            .repos
            .groups
            .all_groups(&GroupFilter {
                student_id: Some(existing.id),
                ..GroupFilter::default()
            })
            .await?;
        if !enrolled.is_empty() {
            return Err(HalaqaError::Conflict(format!(
                "Student is enrolled in {} group(s); remove them from the roster first",
                enrolled.len()
            ))
            .into());
        }
    }

    Ok(())
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> Result<Json<Page<User>>, AppError> {
    require(&auth.actor, Action::ViewUsers, None)?;

    let page = PageRequest::new(query.page, query.limit);
    let filter = UserFilter {
        role: query.role,
        search: query.search,
    };
    let (users, total) = state.repos.users.list_users(&filter, page).await?;

    Ok(Json(Page::new(users, total, page)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    if !auth.actor.can(Action::ViewUsers, None) {
        require(&auth.actor, Action::ViewProfile, Some(id))?;
    }

    let user = state
        .repos
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("User with ID {} not found", id)))?;

    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppJson(mut payload): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require(&auth.actor, Action::ManageUsers, None)?;

    payload.username = payload.username.trim().to_string();
    payload.name = payload.name.trim().to_string();
    payload.email = normalize_email(payload.email);
    payload.validate()?;

    ensure_unique(&state, Some(&payload.username), payload.email.as_deref(), None).await?;

    let user = state
        .repos
        .users
        .create_user(NewUser {
            password_hash: hash_password(&payload.password)?,
            username: payload.username,
            name: payload.name,
            email: payload.email,
            role: payload.role,
            profile: payload.profile,
        })
        .await?;

    tracing::info!("User {} created as {} by {}", user.id, user.role, auth.actor.id);
    Ok((StatusCode::CREATED, Json(user)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(mut payload): AppJson<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    require(&auth.actor, Action::ManageUsers, None)?;

    payload.username = payload.username.map(|u| u.trim().to_string());
    payload.name = payload.name.map(|n| n.trim().to_string());
    payload.email = normalize_email(payload.email);
    payload.validate()?;

    let existing = state
        .repos
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("User with ID {} not found", id)))?;

    if let Some(role) = payload.role.filter(|role| *role != existing.role) {
        require(&auth.actor, Action::ChangeUserRole, None)?;
        if id == auth.actor.id {
            return Err(HalaqaError::Conflict("You cannot change your own role".to_string()).into());
        }
        ensure_role_change_keeps_groups(&state, &existing, role).await?;
    }

    ensure_unique(&state, payload.username.as_deref(), payload.email.as_deref(), Some(id)).await?;

    let password_hash = match payload.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let changes = UserChanges {
        username: payload.username,
        name: payload.name,
        email: payload.email,
        role: payload.role,
        password_hash,
        profile: payload.profile,
    };

    let user = state
        .repos
        .users
        .update_user(id, changes)
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("User with ID {} not found", id)))?;

    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require(&auth.actor, Action::ManageUsers, None)?;

    if id == auth.actor.id {
        return Err(HalaqaError::Conflict("You cannot delete your own account".to_string()).into());
    }

    let tutored = state
        .repos
        .groups
        .all_groups(&GroupFilter {
            tutor_id: Some(id),
            ..GroupFilter::default()
        })
        .await?;
    if !tutored.is_empty() {
        return Err(HalaqaError::Conflict(format!(
            "User still tutors {} group(s); reassign them first",
            tutored.len()
        ))
        .into());
    }

    // Finalized sheets are permanent; a student who appears on one stays.
    let history = state.repos.attendance.history_for_students(&[id]).await?;
    if !history.is_empty() {
        return Err(HalaqaError::Conflict(format!(
            "User has {} finalized attendance record(s) and cannot be deleted",
            history.len()
        ))
        .into());
    }

    if !state.repos.users.delete_user(id).await? {
        return Err(HalaqaError::NotFound(format!("User with ID {} not found", id)).into());
    }

    tracing::info!("User {} deleted by {}", id, auth.actor.id);
    Ok(StatusCode::NO_CONTENT)
}
