//! Transaction Ledger
//!
//! Owns the `transactions` table. Standalone postings are written here
//! directly; transfer postings are written through the `*_in` helpers
//! inside the transfer handler's database transaction.

use sqlx::{PgConnection, PgPool};

use crate::domain::{normalize_amount, Transaction, TransactionFilter};
use crate::error::AppResult;
use crate::handlers::{NewTransaction, TransactionCommand, TransactionPatch};

const TRANSACTION_COLUMNS: &str =
    "t.id, t.description, t.type, t.date, t.amount, t.acc_id, t.status, t.transfer_id";

/// Repository for ledger postings
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    pool: PgPool,
}

impl TransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Transactions on accounts owned by `user_id` that match `filter`.
    pub async fn find(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            JOIN accounts a ON a.id = t.acc_id
            WHERE a.user_id = $1
              AND ($2::BIGINT IS NULL OR t.id = $2)
              AND ($3::BIGINT IS NULL OR t.acc_id = $3)
              AND ($4::BOOLEAN IS NULL OR t.status = $4)
              AND ($5::BIGINT IS NULL OR t.transfer_id = $5)
            ORDER BY t.id
            "#
        );

        sqlx::query_as::<_, Transaction>(&query)
            .bind(user_id)
            .bind(filter.id)
            .bind(filter.account_id)
            .bind(filter.status)
            .bind(filter.transfer_id)
            .fetch_all(&self.pool)
            .await
    }

    /// First transaction matching `filter`, with no ownership scoping.
    pub async fn find_one(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            WHERE ($1::BIGINT IS NULL OR t.id = $1)
              AND ($2::BIGINT IS NULL OR t.acc_id = $2)
              AND ($3::BOOLEAN IS NULL OR t.status = $3)
              AND ($4::BIGINT IS NULL OR t.transfer_id = $4)
            ORDER BY t.id
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, Transaction>(&query)
            .bind(filter.id)
            .bind(filter.account_id)
            .bind(filter.status)
            .bind(filter.transfer_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Validate, normalize and insert a standalone transaction.
    pub async fn save(&self, command: &TransactionCommand) -> AppResult<Transaction> {
        let transaction = command.validate()?;

        let mut conn = self.pool.acquire().await?;
        let stored = Self::insert_in(&mut *conn, &transaction).await?;

        tracing::debug!(
            transaction_id = stored.id,
            account_id = stored.account_id,
            amount = %stored.amount,
            "Transaction saved"
        );

        Ok(stored)
    }

    /// Insert an already validated posting on the given connection.
    pub(crate) async fn insert_in(
        conn: &mut PgConnection,
        transaction: &NewTransaction,
    ) -> Result<Transaction, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions AS t (description, type, date, amount, acc_id, status, transfer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING t.id, t.description, t.type, t.date, t.amount, t.acc_id, t.status, t.transfer_id
            "#,
        )
        .bind(&transaction.description)
        .bind(transaction.direction.code())
        .bind(transaction.date)
        .bind(transaction.amount)
        .bind(transaction.account_id)
        .bind(transaction.status)
        .bind(transaction.transfer_id)
        .fetch_one(&mut *conn)
        .await
    }

    /// Partial update. Returns `None` when no row has this id.
    ///
    /// When the patch touches the amount or the direction, the amount is
    /// re-normalized against the effective direction so the stored sign
    /// keeps matching it. Other fields are written as given.
    pub async fn update(
        &self,
        id: i64,
        patch: &TransactionPatch,
    ) -> AppResult<Option<Transaction>> {
        let direction = patch.validate()?;

        let mut tx = self.pool.begin().await?;

        let current: Option<Transaction> = sqlx::query_as(
            r#"
            SELECT t.id, t.description, t.type, t.date, t.amount, t.acc_id, t.status, t.transfer_id
            FROM transactions t
            WHERE t.id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let direction = direction.unwrap_or(current.direction);
        let amount = if patch.amount.is_some() || patch.direction.is_some() {
            normalize_amount(patch.amount.unwrap_or(current.amount), direction)
        } else {
            current.amount
        };

        let updated: Transaction = sqlx::query_as(
            r#"
            UPDATE transactions AS t
            SET description = COALESCE($2, t.description),
                type        = $3,
                date        = COALESCE($4, t.date),
                amount      = $5,
                acc_id      = COALESCE($6, t.acc_id),
                status      = COALESCE($7, t.status)
            WHERE t.id = $1
            RETURNING t.id, t.description, t.type, t.date, t.amount, t.acc_id, t.status, t.transfer_id
            "#,
        )
        .bind(id)
        .bind(patch.description.as_deref().map(str::trim))
        .bind(direction.code())
        .bind(patch.date)
        .bind(amount)
        .bind(patch.account_id)
        .bind(patch.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(transaction_id = id, "Transaction updated");
        Ok(Some(updated))
    }

    /// Delete by id. Deleting a missing row is a no-op.
    pub async fn remove(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(transaction_id = id, rows = result.rows_affected(), "Transaction removed");
        Ok(result.rows_affected())
    }

    /// Delete every posting linked to a transfer, on the given connection.
    pub(crate) async fn remove_by_transfer_in(
        conn: &mut PgConnection,
        transfer_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE transfer_id = $1")
            .bind(transfer_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
