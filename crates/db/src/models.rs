use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Result, eyre};
use halaqa_core::models::{
    attendance::{AttendanceHistoryItem, AttendanceRecord},
    group::{Group, GroupStatus, ScheduleDay},
    session::Session,
    user::{Role, User, UserProfile},
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = eyre::Report;

    fn try_from(row: DbUser) -> Result<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            name: row.name,
            email: row.email,
            role: row.role.parse::<Role>().map_err(|e| eyre!(e))?,
            profile: UserProfile {
                phone: row.phone,
                whatsapp: row.whatsapp,
                telegram: row.telegram,
                notes: row.notes,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUserCredentials {
    #[sqlx(flatten)]
    pub user: DbUser,
    pub password_hash: String,
}

/// A user together with the stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

impl TryFrom<DbUserCredentials> for UserCredentials {
    type Error = eyre::Report;

    fn try_from(row: DbUserCredentials) -> Result<Self> {
        Ok(UserCredentials {
            user: row.user.try_into()?,
            password_hash: row.password_hash,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub tutor_id: Uuid,
    pub status: String,
    pub schedule_days: Json<Vec<ScheduleDay>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbGroup {
    pub fn into_group(self, students: Vec<Uuid>) -> Result<Group> {
        Ok(Group {
            id: self.id,
            name: self.name,
            description: self.description,
            tutor_id: self.tutor_id,
            status: self.status.parse::<GroupStatus>().map_err(|e| eyre!(e))?,
            schedule_days: self.schedule_days.0,
            students,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbGroupStudent {
    pub group_id: Uuid,
    pub student_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSession {
    pub id: Uuid,
    pub group_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbSession> for Session {
    type Error = eyre::Report;

    fn try_from(row: DbSession) -> Result<Self> {
        Ok(Session {
            id: row.id,
            group_id: row.group_id,
            date: row.date,
            time: row.time,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAttendanceRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAttendanceRecord> for AttendanceRecord {
    type Error = eyre::Report;

    fn try_from(row: DbAttendanceRecord) -> Result<Self> {
        Ok(AttendanceRecord {
            id: row.id,
            session_id: row.session_id,
            student_id: row.student_id,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAttendanceHistory {
    pub session_id: Uuid,
    pub group_id: Uuid,
    pub student_id: Uuid,
    pub session_date: NaiveDate,
    pub status: String,
}

impl TryFrom<DbAttendanceHistory> for AttendanceHistoryItem {
    type Error = eyre::Report;

    fn try_from(row: DbAttendanceHistory) -> Result<Self> {
        Ok(AttendanceHistoryItem {
            session_id: row.session_id,
            group_id: row.group_id,
            student_id: row.student_id,
            session_date: row.session_date,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
        })
    }
}

/// Converts a batch of rows, failing on the first unreadable one.
pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = eyre::Report>,
{
    rows.into_iter().map(T::try_from).collect()
}
