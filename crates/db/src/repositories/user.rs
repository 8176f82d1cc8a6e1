use async_trait::async_trait;
use chrono::Utc;
use eyre::Result;
use halaqa_core::models::{
    common::PageRequest,
    session::SessionStatus,
    user::{User, UserFilter, UserProfile},
};
use uuid::Uuid;

use super::{NewUser, UserChanges, UserRepository};
use crate::{
    DbPool,
    models::{DbUser, DbUserCredentials, UserCredentials, convert_all},
};

const USER_COLUMNS: &str =
    "id, username, name, email, role, phone, whatsapp, telegram, notes, created_at, updated_at";

/// `%term%` for ILIKE, with the wildcard characters of the term escaped.
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        let escaped = s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        format!("%{escaped}%")
    })
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        tracing::debug!("Creating user: id={}, username={}, role={}", id, user.username, user.role);

        let row = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            INSERT INTO users (id, username, name, email, role, password_hash,
                               phone, whatsapp, telegram, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.profile.phone)
        .bind(&user.profile.whatsapp)
        .bind(&user.profile.telegram)
        .bind(&user.profile.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        tracing::debug!("Getting user by id: {}", id);

        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY name"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn get_credentials(&self, login: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, DbUserCredentials>(&format!(
            r#"
            SELECT {USER_COLUMNS}, password_hash
            FROM users
            WHERE username = $1 OR LOWER(email) = LOWER($1)
            LIMIT 1
            "#
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserCredentials::try_from).transpose()
    }

    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(hash)
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let role = filter.role.map(|r| r.as_str());
        let search = like_pattern(filter.search.as_deref());

        tracing::debug!("Listing users: role={:?}, search={:?}, page={:?}", role, search, page);

        let predicate = r#"
            ($1::text IS NULL OR role = $1)
            AND ($2::text IS NULL OR username ILIKE $2 OR name ILIKE $2 OR email ILIKE $2)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users WHERE {predicate}"
        ))
        .bind(role)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE {predicate}
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(role)
        .bind(&search)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((convert_all(rows)?, total))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        tracing::debug!("Updating user: id={}", id);

        let replace_profile = changes.profile.is_some();
        let profile = changes.profile.unwrap_or_else(UserProfile::default);

        let row = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                role = COALESCE($5, role),
                password_hash = COALESCE($6, password_hash),
                phone = CASE WHEN $7 THEN $8 ELSE phone END,
                whatsapp = CASE WHEN $7 THEN $9 ELSE whatsapp END,
                telegram = CASE WHEN $7 THEN $10 ELSE telegram END,
                notes = CASE WHEN $7 THEN $11 ELSE notes END,
                updated_at = $12
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.password_hash)
        .bind(replace_profile)
        .bind(profile.phone)
        .bind(profile.whatsapp)
        .bind(profile.telegram)
        .bind(profile.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        tracing::debug!("Deleting user: id={}", id);

        let mut tx = self.pool.begin().await?;

        // Drafts on open sessions go with the user; finalized rows keep the
        // foreign key from letting the delete through.
        sqlx::query(
            r#"
            DELETE FROM attendance_records a
            USING sessions s
            WHERE s.id = a.session_id AND a.student_id = $1 AND s.status <> $2
            "#,
        )
        .bind(id)
        .bind(SessionStatus::Completed.as_str())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
