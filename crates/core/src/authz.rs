//! # Authorization gate
//!
//! A single policy table decides what each role may do. Handlers call
//! [`authorize`] (or [`Actor::require`]) once, with the owner of the
//! resource when the action is scoped to one, instead of sprinkling role
//! checks through the code.
//!
//! For group-scoped actions the owner is the group's tutor; for profile
//! actions it is the user being viewed or edited.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{HalaqaError, HalaqaResult},
    models::user::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    ViewUsers,
    ManageUsers,
    ChangeUserRole,
    ViewProfile,
    UpdateProfile,
    ViewGroup,
    CreateGroup,
    UpdateGroup,
    AssignTutor,
    ChangeGroupStatus,
    DeleteGroup,
    ManageRoster,
    ViewSessions,
    ManageSessions,
    RecordAttendance,
    ViewReports,
}

impl Action {
    pub const ALL: [Action; 16] = [
        Action::ViewUsers,
        Action::ManageUsers,
        Action::ChangeUserRole,
        Action::ViewProfile,
        Action::UpdateProfile,
        Action::ViewGroup,
        Action::CreateGroup,
        Action::UpdateGroup,
        Action::AssignTutor,
        Action::ChangeGroupStatus,
        Action::DeleteGroup,
        Action::ManageRoster,
        Action::ViewSessions,
        Action::ManageSessions,
        Action::RecordAttendance,
        Action::ViewReports,
    ];
}

/// How far a role's permission for an action reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Allowed on every resource.
    Any,
    /// Allowed only where the actor is the resource owner.
    OwnedOnly,
    /// Never allowed.
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The policy table.
pub fn scope(role: Role, action: Action) -> Scope {
    use Action::*;
    use Scope::*;

    match (role, action) {
        // Users edit only their own profile, admins included; admins edit
        // others through the user management actions.
        (_, UpdateProfile) => OwnedOnly,
        (Role::Admin, _) => Any,

        (Role::Moderator, ManageUsers | ChangeUserRole) => Never,
        (Role::Moderator, ViewProfile) => OwnedOnly,
        (Role::Moderator, _) => Any,

        (
            Role::Tutor,
            ViewProfile | ViewGroup | UpdateGroup | ManageRoster | ViewSessions | ManageSessions
            | RecordAttendance,
        ) => OwnedOnly,
        (Role::Tutor, _) => Never,

        (Role::Student, ViewProfile) => OwnedOnly,
        (Role::Student, _) => Never,
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn can(&self, action: Action, owner_id: Option<Uuid>) -> bool {
        authorize(self, action, owner_id).is_allowed()
    }

    /// Like [`authorize`], but as a `Result` carrying the uniform denial.
    pub fn require(&self, action: Action, owner_id: Option<Uuid>) -> HalaqaResult<()> {
        match authorize(self, action, owner_id) {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(HalaqaError::forbidden()),
        }
    }

    /// True when the role sees every group rather than only its own.
    pub fn sees_all_groups(&self) -> bool {
        scope(self.role, Action::ViewGroup) == Scope::Any
    }
}

/// Decides whether `actor` may perform `action` on a resource owned by
/// `owner_id`. An owner-scoped permission with no known owner denies.
pub fn authorize(actor: &Actor, action: Action, owner_id: Option<Uuid>) -> Decision {
    let allowed = match scope(actor.role, action) {
        Scope::Any => true,
        Scope::OwnedOnly => owner_id == Some(actor.id),
        Scope::Never => false,
    };
    if allowed { Decision::Allow } else { Decision::Deny }
}
