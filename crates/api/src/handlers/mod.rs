pub mod attendance;
pub mod auth;
pub mod groups;
pub mod profile;
pub mod reports;
pub mod sessions;
pub mod users;

use chrono::{NaiveDate, Utc};
use halaqa_core::{
    authz::{Action, Actor, Scope, scope},
    errors::HalaqaError,
    models::{group::Group, session::Session},
};
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

/// Due-ness is judged against the UTC calendar date.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Runs the authorization gate, logging denials.
pub(crate) fn require(actor: &Actor, action: Action, owner_id: Option<Uuid>) -> Result<(), AppError> {
    actor.require(action, owner_id).map_err(|err| {
        tracing::debug!("Denied {:?} to {} {} (owner {:?})", action, actor.role, actor.id, owner_id);
        AppError(err)
    })
}

/// The answer for a resource that does not exist.
///
/// Roles with an unrestricted scope learn that it is missing. Everyone else
/// gets the same denial they would get for someone else's resource.
fn missing(actor: &Actor, action: Action, what: &str, id: Uuid) -> AppError {
    if scope(actor.role, action) == Scope::Any {
        AppError(HalaqaError::NotFound(format!("{what} with ID {id} not found")))
    } else {
        tracing::debug!("Denied {:?} to {} {} on missing {}", action, actor.role, actor.id, id);
        AppError(HalaqaError::forbidden())
    }
}

/// Loads a group and checks `action` against its tutor.
pub(crate) async fn load_group(
    state: &ApiState,
    actor: &Actor,
    group_id: Uuid,
    action: Action,
) -> Result<Group, AppError> {
    match state.repos.groups.get_group(group_id).await? {
        Some(group) => {
            require(actor, action, Some(group.tutor_id))?;
            Ok(group)
        }
        None => Err(missing(actor, action, "Group", group_id)),
    }
}

/// Loads a session with its group and checks `action` against the group's
/// tutor.
pub(crate) async fn load_session(
    state: &ApiState,
    actor: &Actor,
    session_id: Uuid,
    action: Action,
) -> Result<(Session, Group), AppError> {
    let Some(session) = state.repos.sessions.get_session(session_id).await? else {
        return Err(missing(actor, action, "Session", session_id));
    };

    let group = state
        .repos
        .groups
        .get_group(session.group_id)
        .await?
        .ok_or_else(|| eyre::eyre!("Session {} references missing group {}", session.id, session.group_id))?;

    require(actor, action, Some(group.tutor_id))?;
    Ok((session, group))
}
