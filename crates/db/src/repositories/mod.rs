//! Persistence seams.
//!
//! Each aggregate gets a repository trait returning domain types. The API
//! holds them as trait objects so handlers can be tested against the mocks
//! in [`crate::mock`].

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use halaqa_core::models::{
    attendance::{AttendanceHistoryItem, AttendanceRecord, SubmitAttendanceRequest},
    common::PageRequest,
    group::{Group, GroupChanges, GroupFilter, GroupStatus, ScheduleDay},
    session::{NewSession, Session, SessionFilter, SessionStatus},
    user::{Role, User, UserFilter, UserProfile},
};
use uuid::Uuid;

use crate::{DbPool, models::UserCredentials};

pub mod attendance;
pub mod group;
pub mod session;
pub mod user;

pub use attendance::PgAttendanceRepository;
pub use group::PgGroupRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub profile: UserProfile,
}

/// Partial user update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub tutor_id: Uuid,
    pub status: GroupStatus,
    pub schedule_days: Vec<ScheduleDay>,
    pub students: Vec<Uuid>,
}

/// Outcome of an attendance submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceWrite {
    Saved {
        session: Session,
        records: Vec<AttendanceRecord>,
    },
    /// The session was finalized or canceled before the lock was taken.
    SessionClosed(SessionStatus),
    SessionMissing,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>>;
    /// Looks a user up by username or email.
    async fn get_credentials(&self, login: &str) -> Result<Option<UserCredentials>>;
    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>>;
    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> Result<bool>;
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool>;
    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> Result<(Vec<User>, i64)>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create_group(&self, group: NewGroup) -> Result<Group>;
    async fn get_group(&self, id: Uuid) -> Result<Option<Group>>;
    async fn list_groups(&self, filter: &GroupFilter, page: PageRequest) -> Result<(Vec<Group>, i64)>;
    /// Unpaginated listing, for reports.
    async fn all_groups(&self, filter: &GroupFilter) -> Result<Vec<Group>>;
    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> Result<Option<Group>>;
    async fn set_group_status(&self, id: Uuid, status: GroupStatus) -> Result<Option<Group>>;
    async fn delete_group(&self, id: Uuid) -> Result<bool>;
    /// Returns false when the student was already enrolled.
    async fn add_student(&self, group_id: Uuid, student_id: Uuid) -> Result<bool>;
    /// Returns false when the student was not enrolled.
    async fn remove_student(&self, group_id: Uuid, student_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// `None` when the group already has a session on that date.
    async fn create_session(&self, session: NewSession) -> Result<Option<Session>>;
    /// Inserts the slots that do not exist yet and returns only those.
    async fn insert_missing_sessions(&self, sessions: Vec<NewSession>) -> Result<Vec<Session>>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;
    async fn list_sessions(&self, group_ids: &[Uuid], filter: &SessionFilter) -> Result<Vec<Session>>;
    async fn count_sessions(&self, group_id: Uuid) -> Result<i64>;
    /// Compare-and-set on the stored status. `None` when the session is
    /// missing or no longer in `from`.
    async fn transition_session(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<Option<Session>>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>>;
    /// Builds the sheet for `roster` from the saved drafts and upserts it,
    /// all under a lock on the session row. Finalizing also drops lines for
    /// students who left the roster and completes the session.
    async fn save_attendance(
        &self,
        session_id: Uuid,
        roster: Vec<Uuid>,
        submission: SubmitAttendanceRequest,
    ) -> Result<AttendanceWrite>;
    async fn history_for_students(&self, student_ids: &[Uuid]) -> Result<Vec<AttendanceHistoryItem>>;
}

/// Every repository the API needs, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
}

impl Repositories {
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            groups: Arc::new(PgGroupRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            attendance: Arc::new(PgAttendanceRepository::new(pool)),
        }
    }
}
