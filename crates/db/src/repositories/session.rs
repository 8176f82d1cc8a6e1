use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use eyre::Result;
use halaqa_core::models::session::{NewSession, Session, SessionFilter, SessionStatus};
use uuid::Uuid;

use super::SessionRepository;
use crate::{
    DbPool,
    models::{DbSession, convert_all},
};

pub(crate) const SESSION_COLUMNS: &str =
    "id, group_id, date, time, status, notes, created_at, updated_at";

pub struct PgSessionRepository {
    pool: DbPool,
}

impl PgSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create_session(&self, session: NewSession) -> Result<Option<Session>> {
        let id = Uuid::new_v4();

        tracing::debug!(
            "Creating session: id={}, group_id={}, date={}",
            id, session.group_id, session.date
        );

        let row = sqlx::query_as::<_, DbSession>(&format!(
            r#"
            INSERT INTO sessions (id, group_id, date, time, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (group_id, date) DO NOTHING
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(session.group_id)
        .bind(session.date)
        .bind(&session.time)
        .bind(SessionStatus::Scheduled.as_str())
        .bind(&session.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    async fn insert_missing_sessions(&self, sessions: Vec<NewSession>) -> Result<Vec<Session>> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = sessions.iter().map(|_| Uuid::new_v4()).collect();
        let group_ids: Vec<Uuid> = sessions.iter().map(|s| s.group_id).collect();
        let dates: Vec<NaiveDate> = sessions.iter().map(|s| s.date).collect();
        let times: Vec<String> = sessions.iter().map(|s| s.time.clone()).collect();

        tracing::debug!("Materializing up to {} sessions", sessions.len());

        let rows = sqlx::query_as::<_, DbSession>(&format!(
            r#"
            INSERT INTO sessions (id, group_id, date, time, status, created_at, updated_at)
            SELECT id, group_id, date, time, $5, $6, $6
            FROM UNNEST($1::uuid[], $2::uuid[], $3::date[], $4::text[]) AS t(id, group_id, date, time)
            ON CONFLICT (group_id, date) DO NOTHING
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(&ids)
        .bind(&group_ids)
        .bind(&dates)
        .bind(&times)
        .bind(SessionStatus::Scheduled.as_str())
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        let mut created: Vec<Session> = convert_all(rows)?;
        created.sort_by_key(|s| s.date);
        Ok(created)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        tracing::debug!("Getting session by id: {}", id);

        let row = sqlx::query_as::<_, DbSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    async fn list_sessions(&self, group_ids: &[Uuid], filter: &SessionFilter) -> Result<Vec<Session>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, DbSession>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM sessions
            WHERE group_id = ANY($1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY date, time
            "#
        ))
        .bind(group_ids)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn count_sessions(&self, group_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn transition_session(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<Option<Session>> {
        tracing::debug!("Transitioning session: id={}, {} -> {}", id, from, to);

        let row = sqlx::query_as::<_, DbSession>(&format!(
            r#"
            UPDATE sessions SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }
}
