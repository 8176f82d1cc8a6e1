use async_trait::async_trait;
use halaqa_core::models::{
    attendance::{AttendanceHistoryItem, AttendanceRecord, SubmitAttendanceRequest},
    common::PageRequest,
    group::{Group, GroupChanges, GroupFilter, GroupStatus},
    session::{NewSession, Session, SessionFilter, SessionStatus},
    user::{User, UserFilter},
};
use mockall::mock;
use uuid::Uuid;

use crate::models::UserCredentials;
use crate::repositories::{
    AttendanceRepository, AttendanceWrite, GroupRepository, NewGroup, NewUser, SessionRepository,
    UserChanges, UserRepository,
};

// Mock repositories for testing
mock! {
    pub UserRepo {}

    #[async_trait]
    impl UserRepository for UserRepo {
        async fn create_user(&self, user: NewUser) -> eyre::Result<User>;
        async fn get_user(&self, id: Uuid) -> eyre::Result<Option<User>>;
        async fn get_users(&self, ids: &[Uuid]) -> eyre::Result<Vec<User>>;
        async fn get_credentials(&self, login: &str) -> eyre::Result<Option<UserCredentials>>;
        async fn get_password_hash(&self, id: Uuid) -> eyre::Result<Option<String>>;
        async fn username_taken(&self, username: &str, except: Option<Uuid>) -> eyre::Result<bool>;
        async fn email_taken(&self, email: &str, except: Option<Uuid>) -> eyre::Result<bool>;
        async fn list_users(
            &self,
            filter: &UserFilter,
            page: PageRequest,
        ) -> eyre::Result<(Vec<User>, i64)>;
        async fn update_user(&self, id: Uuid, changes: UserChanges) -> eyre::Result<Option<User>>;
        async fn delete_user(&self, id: Uuid) -> eyre::Result<bool>;
    }
}

mock! {
    pub GroupRepo {}

    #[async_trait]
    impl GroupRepository for GroupRepo {
        async fn create_group(&self, group: NewGroup) -> eyre::Result<Group>;
        async fn get_group(&self, id: Uuid) -> eyre::Result<Option<Group>>;
        async fn list_groups(
            &self,
            filter: &GroupFilter,
            page: PageRequest,
        ) -> eyre::Result<(Vec<Group>, i64)>;
        async fn all_groups(&self, filter: &GroupFilter) -> eyre::Result<Vec<Group>>;
        async fn update_group(&self, id: Uuid, changes: GroupChanges) -> eyre::Result<Option<Group>>;
        async fn set_group_status(&self, id: Uuid, status: GroupStatus) -> eyre::Result<Option<Group>>;
        async fn delete_group(&self, id: Uuid) -> eyre::Result<bool>;
        async fn add_student(&self, group_id: Uuid, student_id: Uuid) -> eyre::Result<bool>;
        async fn remove_student(&self, group_id: Uuid, student_id: Uuid) -> eyre::Result<bool>;
    }
}

mock! {
    pub SessionRepo {}

    #[async_trait]
    impl SessionRepository for SessionRepo {
        async fn create_session(&self, session: NewSession) -> eyre::Result<Option<Session>>;
        async fn insert_missing_sessions(&self, sessions: Vec<NewSession>) -> eyre::Result<Vec<Session>>;
        async fn get_session(&self, id: Uuid) -> eyre::Result<Option<Session>>;
        async fn list_sessions(
            &self,
            group_ids: &[Uuid],
            filter: &SessionFilter,
        ) -> eyre::Result<Vec<Session>>;
        async fn count_sessions(&self, group_id: Uuid) -> eyre::Result<i64>;
        async fn transition_session(
            &self,
            id: Uuid,
            from: SessionStatus,
            to: SessionStatus,
        ) -> eyre::Result<Option<Session>>;
    }
}

mock! {
    pub AttendanceRepo {}

    #[async_trait]
    impl AttendanceRepository for AttendanceRepo {
        async fn list_for_session(&self, session_id: Uuid) -> eyre::Result<Vec<AttendanceRecord>>;
        async fn save_attendance(
            &self,
            session_id: Uuid,
            roster: Vec<Uuid>,
            submission: SubmitAttendanceRequest,
        ) -> eyre::Result<AttendanceWrite>;
        async fn history_for_students(
            &self,
            student_ids: &[Uuid],
        ) -> eyre::Result<Vec<AttendanceHistoryItem>>;
    }
}
