//! Balance Aggregator
//!
//! Per-account net balance over confirmed postings, computed on read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{format_money, AccountBalance};

/// Raw aggregate as returned by the database
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BalanceRow {
    pub id: i64,
    pub sum: Decimal,
}

impl From<BalanceRow> for AccountBalance {
    fn from(row: BalanceRow) -> Self {
        Self {
            id: row.id,
            sum: format_money(row.sum),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BalanceAggregator {
    pool: PgPool,
}

impl BalanceAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Net balance of each of `user_id`'s accounts, counting only confirmed
    /// postings dated at or before `as_of`. Accounts with no such posting are
    /// left out. Ordered by account id.
    pub async fn balance(
        &self,
        user_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AccountBalance>, sqlx::Error> {
        let rows: Vec<BalanceRow> = sqlx::query_as(
            r#"
            SELECT t.acc_id AS id, SUM(t.amount) AS sum
            FROM transactions t
            JOIN accounts a ON a.id = t.acc_id
            WHERE a.user_id = $1
              AND t.status = TRUE
              AND t.date <= $2
            GROUP BY t.acc_id
            ORDER BY t.acc_id
            "#,
        )
        .bind(user_id)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(user_id, accounts = rows.len(), "Balance computed");
        Ok(rows.into_iter().map(AccountBalance::from).collect())
    }

    /// [`Self::balance`] as of the current instant.
    pub async fn balance_now(&self, user_id: i64) -> Result<Vec<AccountBalance>, sqlx::Error> {
        self.balance(user_id, Utc::now()).await
    }
}
