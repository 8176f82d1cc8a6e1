use async_trait::async_trait;
use chrono::Utc;
use eyre::Result;
use halaqa_core::models::{
    attendance::{
        AttendanceEntry, AttendanceHistoryItem, AttendanceRecord, SubmitAttendanceRequest,
        off_roster,
    },
    session::{Session, SessionStatus},
};
use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use super::{AttendanceRepository, AttendanceWrite, session::SESSION_COLUMNS};
use crate::{
    DbPool,
    models::{DbAttendanceHistory, DbAttendanceRecord, DbSession, convert_all},
};

const RECORD_COLUMNS: &str = "id, session_id, student_id, status, notes, created_at, updated_at";

pub struct PgAttendanceRepository {
    pool: DbPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn upsert_records(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    entries: &[AttendanceEntry],
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = entries.iter().map(|_| Uuid::new_v4()).collect();
    let students: Vec<Uuid> = entries.iter().map(|e| e.student_id).collect();
    let statuses: Vec<String> = entries.iter().map(|e| e.status.to_string()).collect();
    let notes: Vec<Option<String>> = entries.iter().map(|e| e.notes.clone()).collect();

    sqlx::query(
        r#"
        INSERT INTO attendance_records (id, session_id, student_id, status, notes, created_at, updated_at)
        SELECT id, $2, student_id, status, notes, $6, $6
        FROM UNNEST($1::uuid[], $3::uuid[], $4::text[], $5::text[]) AS t(id, student_id, status, notes)
        ON CONFLICT (session_id, student_id) DO UPDATE SET
            status = EXCLUDED.status,
            notes = EXCLUDED.notes,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&ids)
    .bind(session_id)
    .bind(&students)
    .bind(&statuses)
    .bind(&notes)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn records_in<'e>(
    executor: impl PgExecutor<'e>,
    session_id: Uuid,
) -> Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query_as::<_, DbAttendanceRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE session_id = $1 ORDER BY created_at, student_id"
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await?;

    convert_all(rows)
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        records_in(&self.pool, session_id).await
    }

    async fn save_attendance(
        &self,
        session_id: Uuid,
        roster: Vec<Uuid>,
        submission: SubmitAttendanceRequest,
    ) -> Result<AttendanceWrite> {
        tracing::debug!(
            "Saving attendance: session_id={}, submitted={}, finalize={}",
            session_id, submission.records.len(), submission.finalize
        );

        let mut tx = self.pool.begin().await?;

        // Serializes concurrent submissions for the same session.
        let locked = sqlx::query_as::<_, DbSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1 FOR UPDATE"
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(locked) = locked else {
            return Ok(AttendanceWrite::SessionMissing);
        };
        let mut session = Session::try_from(locked)?;
        if session.status.is_terminal() {
            tracing::debug!("Session {} already {}", session_id, session.status);
            return Ok(AttendanceWrite::SessionClosed(session.status));
        }

        // Drafts are read under the lock so a concurrent save is never
        // overwritten by the prefilled default.
        let existing = records_in(&mut *tx, session_id).await?;
        let entries = submission.sheet(&roster, &existing);
        upsert_records(&mut tx, session_id, &entries).await?;

        if submission.finalize {
            let stale = off_roster(&roster, &existing);
            if !stale.is_empty() {
                tracing::debug!("Dropping {} off-roster line(s) from session {}", stale.len(), session_id);
                sqlx::query("DELETE FROM attendance_records WHERE session_id = $1 AND student_id = ANY($2)")
                    .bind(session_id)
                    .bind(&stale)
                    .execute(&mut *tx)
                    .await?;
            }

            let completed = sqlx::query_as::<_, DbSession>(&format!(
                r#"
                UPDATE sessions SET status = $2, updated_at = $3
                WHERE id = $1
                RETURNING {SESSION_COLUMNS}
                "#
            ))
            .bind(session_id)
            .bind(SessionStatus::Completed.as_str())
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;
            session = completed.try_into()?;
        }

        let records = records_in(&mut *tx, session_id).await?;

        tx.commit().await?;

        Ok(AttendanceWrite::Saved { session, records })
    }

    async fn history_for_students(&self, student_ids: &[Uuid]) -> Result<Vec<AttendanceHistoryItem>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Drafts on sessions that are still open do not count yet.
        let rows = sqlx::query_as::<_, DbAttendanceHistory>(
            r#"
            SELECT a.session_id, s.group_id, a.student_id, s.date AS session_date, a.status
            FROM attendance_records a
            JOIN sessions s ON s.id = a.session_id
            WHERE a.student_id = ANY($1) AND s.status = $2
            ORDER BY s.date DESC, s.time DESC
            "#,
        )
        .bind(student_ids)
        .bind(SessionStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}
