use axum::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::AppResult;
use crate::users::repo_types::{normalize_email, Audit, NewUser, User, UserPatch};

const USER_COLUMNS: &str = "id, name, email, password_hash, city, country, phone, postal_code, \
     created_at, created_from, updated_at, updated_from";

/// Storage port for the `users` table.
///
/// Implementations translate storage failures into `AppError`; a unique
/// index violation on the email surfaces as `AppError::DuplicateEmail`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser, audit: Audit) -> AppResult<User>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn get_all(&self) -> AppResult<Vec<User>>;

    /// Returns `None` when no row has this id.
    async fn update(&self, id: i64, patch: UserPatch, audit: Audit) -> AppResult<Option<User>>;

    /// Returns `false` when no row has this id.
    async fn delete(&self, id: i64) -> AppResult<bool>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// Returns `false` when no row has this email.
    async fn update_password(&self, email: &str, password_hash: &str, audit: Audit)
        -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser, audit: Audit) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, city, country, phone, postal_code,
                               created_at, created_from)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(user.name)
            .bind(normalize_email(&user.email))
            .bind(user.password_hash)
            .bind(user.city)
            .bind(user.country)
            .bind(user.phone)
            .bind(user.postal_code)
            .bind(audit.at)
            .bind(audit.from)
            .fetch_one(&self.db)
            .await?;
        debug!(user_id = row.id, "user row inserted");
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query_as::<_, User>(&sql).fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn update(&self, id: i64, patch: UserPatch, audit: Audit) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET name          = COALESCE($2, name),
                   email         = COALESCE($3, email),
                   password_hash = COALESCE($4, password_hash),
                   city          = COALESCE($5, city),
                   country       = COALESCE($6, country),
                   phone         = COALESCE($7, phone),
                   postal_code   = COALESCE($8, postal_code),
                   updated_at    = $9,
                   updated_from  = $10
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email.as_deref().map(normalize_email))
            .bind(patch.password_hash)
            .bind(patch.city)
            .bind(patch.country)
            .bind(patch.phone)
            .bind(patch.postal_code)
            .bind(audit.at)
            .bind(audit.from)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = $1)")
                .bind(normalize_email(email))
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
        audit: Audit,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, updated_at = $3, updated_from = $4
             WHERE lower(email) = $1
            "#,
        )
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(audit.at)
        .bind(audit.from)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
