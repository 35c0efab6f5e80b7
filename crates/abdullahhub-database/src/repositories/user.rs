//! User repository implementation.

use sqlx::PgPool;

use abdullahhub_core::result::AppResult;
use abdullahhub_core::types::{PageRequest, PageResponse, UserId};
use abdullahhub_entity::user::{CreateUser, User};

use super::{db_err, map_unique};

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. Duplicate usernames or emails yield a conflict.
    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, email, password_hash, is_admin, is_verified)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.is_admin)
        .bind(data.is_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.constraint() == Some("users_email_key") => {
                map_unique(e, "users_email_key", "Email already registered", "Failed to create user")
            }
            other => map_unique(
                other,
                "users_username_key",
                "Username already taken",
                "Failed to create user",
            ),
        })
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by id"))
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by username"))
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by email"))
    }

    /// List users, newest first.
    pub async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<User>> {
        let total = self.count().await?;

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list users"))?;

        Ok(PageResponse::new(users, page, total.max(0) as u64))
    }

    /// Most recently registered users.
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list recent users"))
    }

    /// Grant or revoke administrator rights.
    pub async fn set_admin(&self, id: UserId, is_admin: bool) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("UPDATE users SET is_admin = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(is_admin)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to update admin flag"))
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, id: UserId, is_active: bool) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to update active flag"))
    }

    /// Mark the email address as confirmed.
    pub async fn mark_verified(&self, id: UserId) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to mark user verified"))?;
        Ok(())
    }

    /// Record a successful authentication.
    pub async fn touch_last_login(&self, id: UserId) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to update last login"))?;
        Ok(())
    }

    /// Total number of users.
    pub async fn count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count users"))
    }
}
