use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use halaqa_core::{
    authz::{Action, Scope, scope},
    errors::HalaqaError,
    models::{
        common::{Page, PageRequest},
        group::{
            AddStudentRequest, CreateGroupRequest, Group, GroupChanges, GroupFilter, GroupStatus,
            UpdateGroupRequest, UpdateGroupStatusRequest,
        },
        user::Role,
    },
    validation::ValidationErrors,
};
use halaqa_db::repositories::NewGroup;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    handlers::{load_group, require},
    middleware::{auth::AuthUser, error_handling::AppError, extract::{AppJson, AppQuery}},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsQuery {
    pub status: Option<GroupStatus>,
    pub tutor_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// The tutor of record must exist and hold a role that can lead a group.
async fn check_tutor(state: &ApiState, tutor_id: Uuid) -> Result<(), AppError> {
    match state.repos.users.get_user(tutor_id).await? {
        Some(user) if user.role.can_lead_group() => Ok(()),
        Some(_) => Err(HalaqaError::invalid_field("tutorId", "must be a tutor").into()),
        None => Err(HalaqaError::invalid_field("tutorId", "does not exist").into()),
    }
}

/// Every roster id must reference a STUDENT user.
async fn check_students(state: &ApiState, field: &str, student_ids: &[Uuid]) -> Result<(), AppError> {
    if student_ids.is_empty() {
        return Ok(());
    }

    let users = state.repos.users.get_users(student_ids).await?;
    let mut errors = ValidationErrors::new();
    for (index, student_id) in student_ids.iter().enumerate() {
        let label = if student_ids.len() == 1 {
            field.to_string()
        } else {
            format!("{field}[{index}]")
        };
        match users.iter().find(|user| user.id == *student_id) {
            Some(user) if user.role == Role::Student => {}
            Some(_) => errors.push(label, "must be a student"),
            None => errors.push(label, "does not exist"),
        }
    }
    errors.into_result()?;
    Ok(())
}

#[axum::debug_handler]
pub async fn list_groups(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppQuery(query): AppQuery<ListGroupsQuery>,
) -> Result<Json<Page<Group>>, AppError> {
    let mut filter = GroupFilter {
        status: query.status,
        tutor_id: query.tutor_id,
        search: query.search,
        ..GroupFilter::default()
    };

    match scope(auth.actor.role, Action::ViewGroup) {
        Scope::Any => {}
        // Tutors only ever see their own groups, whatever they ask for.
        Scope::OwnedOnly => filter.tutor_id = Some(auth.actor.id),
        Scope::Never => require(&auth.actor, Action::ViewGroup, None)?,
    }

    let page = PageRequest::new(query.page, query.limit);
    let (groups, total) = state.repos.groups.list_groups(&filter, page).await?;

    Ok(Json(Page::new(groups, total, page)))
}

#[axum::debug_handler]
pub async fn get_group(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Group>, AppError> {
    let group = load_group(&state, &auth.actor, id, Action::ViewGroup).await?;
    Ok(Json(group))
}

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppJson(mut payload): AppJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    require(&auth.actor, Action::CreateGroup, None)?;

    payload.name = payload.name.trim().to_string();
    payload.validate()?;
    check_tutor(&state, payload.tutor_id).await?;
    check_students(&state, "students", &payload.students).await?;

    let group = state
        .repos
        .groups
        .create_group(NewGroup {
            name: payload.name,
            description: payload.description,
            tutor_id: payload.tutor_id,
            status: payload.status.unwrap_or_default(),
            schedule_days: payload.schedule_days,
            students: payload.students,
        })
        .await?;

    tracing::info!("Group {} created by {}", group.id, auth.actor.id);
    Ok((StatusCode::CREATED, Json(group)))
}

#[axum::debug_handler]
pub async fn update_group(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(mut payload): AppJson<UpdateGroupRequest>,
) -> Result<Json<Group>, AppError> {
    let group = load_group(&state, &auth.actor, id, Action::UpdateGroup).await?;

    payload.name = payload.name.map(|name| name.trim().to_string());
    payload.validate()?;

    if let Some(tutor_id) = payload.tutor_id.filter(|t| *t != group.tutor_id) {
        require(&auth.actor, Action::AssignTutor, Some(group.tutor_id))?;
        check_tutor(&state, tutor_id).await?;
    }
    if payload.status.is_some_and(|s| s != group.status) {
        require(&auth.actor, Action::ChangeGroupStatus, Some(group.tutor_id))?;
    }

    let group = state
        .repos
        .groups
        .update_group(id, GroupChanges::from(payload))
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("Group with ID {} not found", id)))?;

    Ok(Json(group))
}

#[axum::debug_handler]
pub async fn update_group_status(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateGroupStatusRequest>,
) -> Result<Json<Group>, AppError> {
    let group = load_group(&state, &auth.actor, id, Action::ChangeGroupStatus).await?;

    if group.status == payload.status {
        return Ok(Json(group));
    }

    let group = state
        .repos
        .groups
        .set_group_status(id, payload.status)
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("Group with ID {} not found", id)))?;

    tracing::info!("Group {} is now {} (by {})", id, group.status, auth.actor.id);
    Ok(Json(group))
}

#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_group(&state, &auth.actor, id, Action::DeleteGroup).await?;

    let sessions = state.repos.sessions.count_sessions(id).await?;
    if sessions > 0 {
        return Err(HalaqaError::Conflict(format!(
            "Group has {sessions} session(s) and cannot be deleted; mark it COMPLETED instead"
        ))
        .into());
    }

    if !state.repos.groups.delete_group(id).await? {
        return Err(HalaqaError::NotFound(format!("Group with ID {} not found", id)).into());
    }

    tracing::info!("Group {} deleted by {}", id, auth.actor.id);
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_student(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<AddStudentRequest>,
) -> Result<Json<Group>, AppError> {
    let group = load_group(&state, &auth.actor, id, Action::ManageRoster).await?;

    if group.has_student(payload.student_id) {
        return Err(HalaqaError::Conflict("Student is already enrolled in this group".to_string()).into());
    }
    check_students(&state, "studentId", &[payload.student_id]).await?;

    if !state.repos.groups.add_student(id, payload.student_id).await? {
        return Err(HalaqaError::Conflict("Student is already enrolled in this group".to_string()).into());
    }

    let group = state
        .repos
        .groups
        .get_group(id)
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("Group with ID {} not found", id)))?;

    Ok(Json(group))
}

#[axum::debug_handler]
pub async fn remove_student(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Group>, AppError> {
    load_group(&state, &auth.actor, id, Action::ManageRoster).await?;

    if !state.repos.groups.remove_student(id, student_id).await? {
        return Err(HalaqaError::NotFound("Student is not enrolled in this group".to_string()).into());
    }

    let group = state
        .repos
        .groups
        .get_group(id)
        .await?
        .ok_or_else(|| HalaqaError::NotFound(format!("Group with ID {} not found", id)))?;

    Ok(Json(group))
}
