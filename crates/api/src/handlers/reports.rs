use axum::{Json, extract::State};
use halaqa_core::{
    authz::{Action, Scope, scope},
    models::{
        attendance::AttendanceHistoryItem,
        group::{Group, GroupFilter},
        report::{DashboardStats, GroupReport, StudentReport},
        session::{SessionFilter, SessionStatus},
    },
    reports,
};
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    ApiState,
    handlers::{load_group, require, today},
    middleware::{auth::AuthUser, error_handling::AppError, extract::AppQuery},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportQuery {
    pub group_id: Option<Uuid>,
}

/// Roster ids across `groups`, first appearance first.
fn roster_of(groups: &[Group]) -> Vec<Uuid> {
    let mut students: Vec<Uuid> = Vec::new();
    for student_id in groups.iter().flat_map(|g| g.students.iter()) {
        if !students.contains(student_id) {
            students.push(*student_id);
        }
    }
    students
}

#[axum::debug_handler]
pub async fn student_reports(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    AppQuery(query): AppQuery<StudentReportQuery>,
) -> Result<Json<Vec<StudentReport>>, AppError> {
    require(&auth.actor, Action::ViewReports, None)?;

    let groups = match query.group_id {
        Some(group_id) => vec![load_group(&state, &auth.actor, group_id, Action::ViewReports).await?],
        None => state.repos.groups.all_groups(&GroupFilter::default()).await?,
    };
    let students = roster_of(&groups);

    let names: HashMap<Uuid, String> = state
        .repos
        .users
        .get_users(&students)
        .await?
        .into_iter()
        .map(|user| (user.id, user.name))
        .collect();

    let history = state.repos.attendance.history_for_students(&students).await?;

    let mut rows: Vec<StudentReport> = students
        .iter()
        .map(|student_id| {
            let own: Vec<AttendanceHistoryItem> = history
                .iter()
                .filter(|item| item.student_id == *student_id)
                .filter(|item| query.group_id.is_none_or(|g| item.group_id == g))
                .cloned()
                .collect();
            let name = names.get(student_id).map(String::as_str).unwrap_or_default();
            reports::student_report(*student_id, name, query.group_id, &own)
        })
        .collect();
    reports::rank_by_percentage(&mut rows, |row| row.percentage);

    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn group_reports(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
) -> Result<Json<Vec<GroupReport>>, AppError> {
    require(&auth.actor, Action::ViewReports, None)?;

    let groups = state.repos.groups.all_groups(&GroupFilter::default()).await?;
    let group_ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();

    let held = SessionFilter {
        status: Some(SessionStatus::Completed),
        ..SessionFilter::default()
    };
    let sessions = state.repos.sessions.list_sessions(&group_ids, &held).await?;
    let history = state
        .repos
        .attendance
        .history_for_students(&roster_of(&groups))
        .await?;

    let mut rows: Vec<GroupReport> = groups
        .iter()
        .map(|group| reports::group_report(group, &sessions, &history))
        .collect();
    reports::rank_by_percentage(&mut rows, |row| row.percentage);

    Ok(Json(rows))
}

/// Headline numbers over the groups the caller can see.
#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    let filter = match scope(auth.actor.role, Action::ViewGroup) {
        Scope::Any => GroupFilter::default(),
        Scope::OwnedOnly => GroupFilter {
            tutor_id: Some(auth.actor.id),
            ..GroupFilter::default()
        },
        Scope::Never => {
            require(&auth.actor, Action::ViewGroup, None)?;
            GroupFilter::default()
        }
    };

    let groups = state.repos.groups.all_groups(&filter).await?;
    let group_ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();

    let mut sessions = state
        .repos
        .sessions
        .list_sessions(&group_ids, &SessionFilter::default())
        .await?;
    sessions.retain(|s| s.status != SessionStatus::Canceled);

    let history = state
        .repos
        .attendance
        .history_for_students(&roster_of(&groups))
        .await?;

    Ok(Json(reports::dashboard_stats(&groups, &sessions, &history, today())))
}
