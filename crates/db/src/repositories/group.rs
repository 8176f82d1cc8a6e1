use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use eyre::Result;
use halaqa_core::models::{
    common::PageRequest,
    group::{Group, GroupChanges, GroupFilter, GroupStatus},
};
use sqlx::types::Json;
use uuid::Uuid;

use super::{GroupRepository, NewGroup, user::like_pattern};
use crate::{
    DbPool,
    models::{DbGroup, DbGroupStudent},
};

const GROUP_COLUMNS: &str =
    "id, name, description, tutor_id, status, schedule_days, created_at, updated_at";

const GROUP_PREDICATE: &str = r#"
    ($1::text IS NULL OR status = $1)
    AND ($2::uuid IS NULL OR tutor_id = $2)
    AND ($3::text IS NULL OR name ILIKE $3)
    AND ($4::uuid IS NULL OR EXISTS (
        SELECT 1 FROM group_students gs WHERE gs.group_id = groups.id AND gs.student_id = $4
    ))
"#;

pub struct PgGroupRepository {
    pool: DbPool,
}

impl PgGroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn rosters(&self, group_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>> {
        let rows = sqlx::query_as::<_, DbGroupStudent>(
            r#"
            SELECT group_id, student_id
            FROM group_students
            WHERE group_id = ANY($1)
            ORDER BY added_at, student_id
            "#,
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut rosters: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in rows {
            rosters.entry(row.group_id).or_default().push(row.student_id);
        }
        Ok(rosters)
    }

    async fn attach_rosters(&self, rows: Vec<DbGroup>) -> Result<Vec<Group>> {
        let ids: Vec<Uuid> = rows.iter().map(|g| g.id).collect();
        let mut rosters = self.rosters(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let students = rosters.remove(&row.id).unwrap_or_default();
                row.into_group(students)
            })
            .collect()
    }

    async fn with_roster(&self, row: Option<DbGroup>) -> Result<Option<Group>> {
        match row {
            Some(row) => Ok(self.attach_rosters(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        tracing::debug!(
            "Creating group: id={}, name={}, tutor_id={}, students={}",
            id, group.name, group.tutor_id, group.students.len()
        );

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, DbGroup>(&format!(
            r#"
            INSERT INTO groups (id, name, description, tutor_id, status, schedule_days, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.tutor_id)
        .bind(group.status.as_str())
        .bind(Json(&group.schedule_days))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_students (group_id, student_id, added_at)
            SELECT $1, student_id, $3 FROM UNNEST($2::uuid[]) AS student_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&group.students)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Group created successfully: id={}", id);
        row.into_group(group.students)
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        tracing::debug!("Getting group by id: {}", id);

        let row = sqlx::query_as::<_, DbGroup>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roster(row).await
    }

    async fn list_groups(&self, filter: &GroupFilter, page: PageRequest) -> Result<(Vec<Group>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let search = like_pattern(filter.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM groups WHERE {GROUP_PREDICATE}"
        ))
        .bind(status)
        .bind(filter.tutor_id)
        .bind(&search)
        .bind(filter.student_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, DbGroup>(&format!(
            r#"
            SELECT {GROUP_COLUMNS} FROM groups
            WHERE {GROUP_PREDICATE}
            ORDER BY created_at DESC, id
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(status)
        .bind(filter.tutor_id)
        .bind(&search)
        .bind(filter.student_id)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((self.attach_rosters(rows).await?, total))
    }

    async fn all_groups(&self, filter: &GroupFilter) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, DbGroup>(&format!(
            r#"
            SELECT {GROUP_COLUMNS} FROM groups
            WHERE {GROUP_PREDICATE}
            ORDER BY created_at, id
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.tutor_id)
        .bind(like_pattern(filter.search.as_deref()))
        .bind(filter.student_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_rosters(rows).await
    }

    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> Result<Option<Group>> {
        tracing::debug!("Updating group: id={}", id);

        let row = sqlx::query_as::<_, DbGroup>(&format!(
            r#"
            UPDATE groups SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                tutor_id = COALESCE($4, tutor_id),
                status = COALESCE($5, status),
                schedule_days = COALESCE($6, schedule_days),
                updated_at = $7
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.tutor_id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.schedule_days.map(Json))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        self.with_roster(row).await
    }

    async fn set_group_status(&self, id: Uuid, status: GroupStatus) -> Result<Option<Group>> {
        tracing::debug!("Setting group status: id={}, status={}", id, status);

        let row = sqlx::query_as::<_, DbGroup>(&format!(
            r#"
            UPDATE groups SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        self.with_roster(row).await
    }

    async fn delete_group(&self, id: Uuid) -> Result<bool> {
        tracing::debug!("Deleting group: id={}", id);

        // Sessions reference groups without a cascade, so a group that has
        // any is refused by the foreign key.
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_student(&self, group_id: Uuid, student_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO group_students (group_id, student_id, added_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(student_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_student(&self, group_id: Uuid, student_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM group_students WHERE group_id = $1 AND student_id = $2")
            .bind(group_id)
            .bind(student_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
