use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use halaqa_core::{
    authz::Action,
    errors::HalaqaError,
    models::{
        group::GroupStatus,
        session::{
            CreateSessionRequest, GenerateSessionsRequest, GenerateSessionsResponse, NewSession,
            Session, SessionFilter, SessionStatus,
        },
    },
    schedule,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    handlers::{load_group, load_session},
    middleware::{auth::AuthUser, error_handling::AppError, extract::{AppJson, AppQuery}},
};

#[axum::debug_handler]
pub async fn list_group_sessions(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    AppQuery(filter): AppQuery<SessionFilter>,
) -> Result<Json<Vec<Session>>, AppError> {
    load_group(&state, &auth.actor, group_id, Action::ViewSessions).await?;

    let sessions = state.repos.sessions.list_sessions(&[group_id], &filter).await?;
    Ok(Json(sessions))
}

/// Adds a one-off session outside the weekly schedule.
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    load_group(&state, &auth.actor, group_id, Action::ManageSessions).await?;
    payload.validate()?;

    let date = payload.date;
    let session = state
        .repos
        .sessions
        .create_session(NewSession {
            group_id,
            date,
            time: payload.time,
            notes: payload.notes,
        })
        .await?
        .ok_or_else(|| HalaqaError::Conflict(format!("Group already has a session on {date}")))?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Materializes the weekly schedule over a date window. Safe to rerun.
#[axum::debug_handler]
pub async fn generate_sessions(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    AppJson(payload): AppJson<GenerateSessionsRequest>,
) -> Result<Json<GenerateSessionsResponse>, AppError> {
    let group = load_group(&state, &auth.actor, group_id, Action::ManageSessions).await?;

    if group.status != GroupStatus::Active {
        return Err(HalaqaError::Conflict(format!(
            "Sessions can only be generated for ACTIVE groups (group is {})",
            group.status
        ))
        .into());
    }

    let slots = schedule::materialize(group.id, &group.schedule_days, payload.from, payload.to)?;
    let requested = slots.len();
    let created = state.repos.sessions.insert_missing_sessions(slots).await?;

    tracing::info!(
        "Generated {} of {} sessions for group {} ({} to {})",
        created.len(), requested, group.id, payload.from, payload.to
    );

    Ok(Json(GenerateSessionsResponse {
        skipped: requested - created.len(),
        created,
    }))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let (session, _) = load_session(&state, &auth.actor, id, Action::ViewSessions).await?;
    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn cancel_session(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let (session, _) = load_session(&state, &auth.actor, id, Action::ManageSessions).await?;

    let next = session.status.transition_to(SessionStatus::Canceled)?;
    let canceled = state
        .repos
        .sessions
        .transition_session(id, session.status, next)
        .await?
        .ok_or_else(|| HalaqaError::Conflict("Session was changed by another request".to_string()))?;

    tracing::info!("Session {} canceled by {}", id, auth.actor.id);
    Ok(Json(canceled))
}
