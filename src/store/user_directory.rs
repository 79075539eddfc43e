//! User Directory
//!
//! Owns the `users` table: unique emails and hashed passwords.

use sqlx::PgPool;

use crate::auth::password;
use crate::domain::{DomainError, User, UserSummary};
use crate::error::AppResult;
use crate::handlers::UserCommand;

/// Equality filter over users
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<i64>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            email: None,
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: Some(email.into()),
        }
    }
}

/// Repository for users
#[derive(Debug, Clone)]
pub struct UserDirectory {
    pool: PgPool,
}

impl UserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a user. The stored password is a salted one-way hash and
    /// the returned row never carries it.
    pub async fn save(&self, command: &UserCommand) -> AppResult<UserSummary> {
        let new_user = command.validate()?;

        if self
            .find_one(&UserFilter::by_email(new_user.email.as_str()))
            .await?
            .is_some()
        {
            return Err(DomainError::conflict("There is already a user with this email").into());
        }

        let hash = password::hash_blocking(new_user.password).await?;

        let user: UserSummary = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// First user matching `filter`, password hash included.
    pub async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, name, email, password
            FROM users
            WHERE ($1::BIGINT IS NULL OR id = $1)
              AND ($2::TEXT IS NULL OR email = $2)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(filter.id)
        .bind(filter.email.as_deref())
        .fetch_optional(&self.pool)
        .await
    }

    /// Every user, without the password column.
    pub async fn find_all(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, email FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }
}
