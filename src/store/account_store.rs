//! Account Store
//!
//! Owns the `accounts` table: per-user unique names, ownership checks and
//! guarded deletion.

use sqlx::PgPool;

use crate::domain::{Account, DomainError, TransactionFilter};
use crate::error::AppResult;
use crate::handlers::AccountCommand;

use super::TransactionLedger;

pub(crate) const NOT_OWNER: &str = "This resource does not belong to this user";

/// Repository for accounts
#[derive(Debug, Clone)]
pub struct AccountStore {
    pool: PgPool,
    ledger: TransactionLedger,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: TransactionLedger::new(pool.clone()),
            pool,
        }
    }

    /// Create an account named `command.name` for `user_id`.
    pub async fn create(&self, user_id: i64, command: &AccountCommand) -> AppResult<Account> {
        let name = command.validate()?;
        self.ensure_name_free(user_id, &name, None).await?;

        let account: Account = sqlx::query_as(
            r#"
            INSERT INTO accounts (name, user_id)
            VALUES ($1, $2)
            RETURNING id, name, user_id
            "#,
        )
        .bind(&name)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(account_id = account.id, user_id, "Account created");
        Ok(account)
    }

    /// All accounts owned by `user_id`, by id.
    pub async fn list(&self, user_id: i64) -> AppResult<Vec<Account>> {
        let accounts = sqlx::query_as(
            "SELECT id, name, user_id FROM accounts WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    /// Raw lookup with no ownership check
    pub async fn find_one(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, user_id FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Account `id` if it exists and belongs to `user_id`.
    pub async fn get_by_id(&self, user_id: i64, id: i64) -> AppResult<Account> {
        let account = self
            .find_one(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Account #{} not found", id)))?;

        if account.user_id != user_id {
            return Err(DomainError::forbidden(NOT_OWNER).into());
        }
        Ok(account)
    }

    /// Rename an owned account.
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        command: &AccountCommand,
    ) -> AppResult<Account> {
        let current = self.get_by_id(user_id, id).await?;
        let name = command.validate()?;
        if name == current.name {
            return Ok(current);
        }
        self.ensure_name_free(user_id, &name, Some(id)).await?;

        let account: Account = sqlx::query_as(
            "UPDATE accounts SET name = $2 WHERE id = $1 RETURNING id, name, user_id",
        )
        .bind(id)
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(account_id = id, "Account renamed");
        Ok(account)
    }

    /// Delete an owned account that no transaction references.
    pub async fn remove(&self, user_id: i64, id: i64) -> AppResult<()> {
        self.get_by_id(user_id, id).await?;

        if self
            .ledger
            .find_one(&TransactionFilter::by_account(id))
            .await?
            .is_some()
        {
            return Err(DomainError::conflict("This account has associated transactions").into());
        }

        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(account_id = id, "Account removed");
        Ok(())
    }

    async fn ensure_name_free(
        &self,
        user_id: i64,
        name: &str,
        except_id: Option<i64>,
    ) -> AppResult<()> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM accounts
                WHERE user_id = $1 AND name = $2 AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        if taken {
            return Err(DomainError::conflict("There is already an account with this name").into());
        }
        Ok(())
    }
}
