//! Transfer Handler
//!
//! Transfers between two accounts of the same user. Every write runs in one
//! database transaction: the transfer row and its two postings are either
//! all visible or all absent.

use sqlx::{PgConnection, PgPool};

use crate::domain::{Account, Direction, DomainError, OperationContext, Transfer, TransferFilter};
use crate::error::AppResult;
use crate::store::TransactionLedger;

use super::{NewTransaction, NewTransfer, TransferCommand};

const TRANSFER_COLUMNS: &str =
    "id, description, date, amount, acc_ori_id, acc_dest_id, user_id";

/// A transfer whose fields and account ownership have been checked.
///
/// Only [`TransferHandler::validate`] builds one, so persistence cannot be
/// reached with an unchecked payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTransfer(NewTransfer);

impl ValidTransfer {
    pub fn fields(&self) -> &NewTransfer {
        &self.0
    }
}

/// Both accounts must exist and belong to the transfer's owner. The source
/// is checked before the destination.
pub fn check_account_ownership(
    transfer: &NewTransfer,
    accounts: &[Account],
) -> Result<(), DomainError> {
    for account_id in [transfer.source_account_id, transfer.destination_account_id] {
        match accounts.iter().find(|a| a.id == account_id) {
            None => {
                return Err(DomainError::validation(format!(
                    "Account #{} does not exist",
                    account_id
                )))
            }
            Some(account) if account.user_id != transfer.user_id => {
                return Err(DomainError::validation(format!(
                    "Account #{} does not belong to the user",
                    account_id
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// The two postings a transfer materializes as: an outflow on the source and
/// an inflow on the destination, both confirmed.
pub fn transfer_postings(transfer_id: i64, transfer: &NewTransfer) -> [NewTransaction; 2] {
    let source = transfer.source_account_id;
    let destination = transfer.destination_account_id;

    [
        NewTransaction {
            description: format!("Transfer to acc #{}", destination),
            amount: -transfer.amount,
            date: transfer.date,
            account_id: source,
            direction: Direction::Outflow,
            status: true,
            transfer_id: Some(transfer_id),
        },
        NewTransaction {
            description: format!("Transfer from acc #{}", source),
            amount: transfer.amount,
            date: transfer.date,
            account_id: destination,
            direction: Direction::Inflow,
            status: true,
            transfer_id: Some(transfer_id),
        },
    ]
}

/// Handler for transfers
#[derive(Debug, Clone)]
pub struct TransferHandler {
    pool: PgPool,
}

impl TransferHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Field checks first, then account ownership against the store.
    pub async fn validate(&self, command: &TransferCommand) -> AppResult<ValidTransfer> {
        let transfer = command.validate_fields()?;

        let accounts: Vec<Account> =
            sqlx::query_as("SELECT id, name, user_id FROM accounts WHERE id = ANY($1)")
                .bind(vec![transfer.source_account_id, transfer.destination_account_id])
                .fetch_all(&self.pool)
                .await?;

        check_account_ownership(&transfer, &accounts)?;
        Ok(ValidTransfer(transfer))
    }

    /// Insert the transfer and its two postings.
    pub async fn save(
        &self,
        transfer: &ValidTransfer,
        context: &OperationContext,
    ) -> AppResult<Transfer> {
        let fields = transfer.fields();
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO transfers (description, date, amount, acc_ori_id, acc_dest_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSFER_COLUMNS}
            "#
        );
        let stored: Transfer = sqlx::query_as(&query)
            .bind(&fields.description)
            .bind(fields.date)
            .bind(fields.amount)
            .bind(fields.source_account_id)
            .bind(fields.destination_account_id)
            .bind(fields.user_id)
            .fetch_one(&mut *tx)
            .await?;

        insert_postings(&mut *tx, stored.id, fields).await?;
        tx.commit().await?;

        tracing::info!(
            transfer_id = stored.id,
            source_account_id = stored.source_account_id,
            destination_account_id = stored.destination_account_id,
            amount = %stored.amount,
            correlation_id = ?context.correlation_id,
            "Transfer saved"
        );

        Ok(stored)
    }

    /// Rewrite the transfer and replace its postings. Returns `None` when no
    /// transfer has this id. The replaced postings get new ids.
    pub async fn update(
        &self,
        id: i64,
        transfer: &ValidTransfer,
        context: &OperationContext,
    ) -> AppResult<Option<Transfer>> {
        let fields = transfer.fields();
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            UPDATE transfers
            SET description = $2,
                date        = $3,
                amount      = $4,
                acc_ori_id  = $5,
                acc_dest_id = $6,
                user_id     = $7
            WHERE id = $1
            RETURNING {TRANSFER_COLUMNS}
            "#
        );
        let updated: Option<Transfer> = sqlx::query_as(&query)
            .bind(id)
            .bind(&fields.description)
            .bind(fields.date)
            .bind(fields.amount)
            .bind(fields.source_account_id)
            .bind(fields.destination_account_id)
            .bind(fields.user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        let removed = TransactionLedger::remove_by_transfer_in(&mut *tx, id).await?;
        insert_postings(&mut *tx, id, fields).await?;
        tx.commit().await?;

        tracing::info!(
            transfer_id = id,
            replaced_postings = removed,
            correlation_id = ?context.correlation_id,
            "Transfer updated"
        );

        Ok(Some(updated))
    }

    /// Delete the postings, then the transfer. Returns whether a transfer
    /// row was deleted.
    pub async fn remove(&self, id: i64, context: &OperationContext) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let postings = TransactionLedger::remove_by_transfer_in(&mut *tx, id).await?;
        let result = sqlx::query("DELETE FROM transfers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = id,
            postings,
            correlation_id = ?context.correlation_id,
            "Transfer removed"
        );

        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE ($1::BIGINT IS NULL OR id = $1)
              AND ($2::BIGINT IS NULL OR user_id = $2)
            ORDER BY id
            "#
        );

        sqlx::query_as(&query)
            .bind(filter.id)
            .bind(filter.user_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_one(&self, filter: &TransferFilter) -> Result<Option<Transfer>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE ($1::BIGINT IS NULL OR id = $1)
              AND ($2::BIGINT IS NULL OR user_id = $2)
            ORDER BY id
            LIMIT 1
            "#
        );

        sqlx::query_as(&query)
            .bind(filter.id)
            .bind(filter.user_id)
            .fetch_optional(&self.pool)
            .await
    }
}

async fn insert_postings(
    conn: &mut PgConnection,
    transfer_id: i64,
    transfer: &NewTransfer,
) -> Result<(), sqlx::Error> {
    for posting in transfer_postings(transfer_id, transfer) {
        TransactionLedger::insert_in(&mut *conn, &posting).await?;
    }
    Ok(())
}
