use axum::{
    Json,
    extract::{Path, State},
};
use halaqa_core::{
    authz::Action,
    errors::HalaqaError,
    models::{
        attendance::{
            AttendanceEntry, AttendanceSheet, SubmitAttendanceRequest, SubmitAttendanceResponse,
            prefill_sheet,
        },
        session::SessionStatus,
    },
    reports,
};
use halaqa_db::repositories::AttendanceWrite;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    handlers::{load_session, today},
    middleware::{auth::AuthUser, error_handling::AppError, extract::AppJson},
};

/// The sheet a tutor fills in. Open sessions are prefilled from the roster;
/// closed ones show exactly what was stored.
#[axum::debug_handler]
pub async fn get_attendance(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<AttendanceSheet>, AppError> {
    let (session, group) = load_session(&state, &auth.actor, session_id, Action::ViewSessions).await?;
    let records = state.repos.attendance.list_for_session(session_id).await?;

    let locked = session.status.is_terminal();
    let entries = if locked {
        records
            .into_iter()
            .map(|record| AttendanceEntry {
                student_id: record.student_id,
                status: record.status,
                notes: record.notes,
            })
            .collect()
    } else {
        prefill_sheet(&group.students, &records)
    };

    Ok(Json(AttendanceSheet {
        session,
        entries,
        locked,
    }))
}

#[axum::debug_handler]
pub async fn submit_attendance(
    State(state): State<Arc<ApiState>>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    AppJson(payload): AppJson<SubmitAttendanceRequest>,
) -> Result<Json<SubmitAttendanceResponse>, AppError> {
    let (session, group) =
        load_session(&state, &auth.actor, session_id, Action::RecordAttendance).await?;

    if session.status.is_terminal() {
        return Err(HalaqaError::Conflict(format!(
            "Attendance for a {} session cannot be changed",
            session.status
        ))
        .into());
    }
    if payload.finalize {
        session.status.transition_to(SessionStatus::Completed)?;
        if !session.is_due(today()) {
            return Err(HalaqaError::Conflict(format!(
                "Session on {} is not due yet and cannot be finalized",
                session.date
            ))
            .into());
        }
    }

    payload.validate_roster(&group.students)?;
    let finalize = payload.finalize;

    match state
        .repos
        .attendance
        .save_attendance(session_id, group.students, payload)
        .await?
    {
        AttendanceWrite::Saved { session, records } => {
            let percentage = reports::percentage(records.iter().map(|r| r.status));
            tracing::info!(
                "Attendance saved for session {} ({} records, finalized: {}, {}%)",
                session_id, records.len(), finalize, percentage
            );
            Ok(Json(SubmitAttendanceResponse {
                session,
                records,
                percentage,
            }))
        }
        AttendanceWrite::SessionClosed(status) => Err(HalaqaError::Conflict(format!(
            "Attendance for a {status} session cannot be changed"
        ))
        .into()),
        AttendanceWrite::SessionMissing => {
            Err(HalaqaError::NotFound(format!("Session with ID {} not found", session_id)).into())
        }
    }
}
