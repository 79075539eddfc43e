//! Ledger records
//!
//! Rows as they are stored and returned to callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::Direction;

/// A registered user. The password hash never leaves the service.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Public projection of a user (id, name, email).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
}

/// A single posting on an account.
///
/// `transfer_id` is set only on the two postings generated by a transfer.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub direction: Direction,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    #[sqlx(rename = "acc_id")]
    pub account_id: i64,
    pub status: bool,
    pub transfer_id: Option<i64>,
}

impl Transaction {
    pub fn is_transfer_posting(&self) -> bool {
        self.transfer_id.is_some()
    }
}

/// A movement between two accounts of the same user. `amount` is the
/// positive magnitude of the movement.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub description: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    #[sqlx(rename = "acc_ori_id")]
    pub source_account_id: i64,
    #[sqlx(rename = "acc_dest_id")]
    pub destination_account_id: i64,
    pub user_id: i64,
}

/// Net confirmed balance of one account, as a two-decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: i64,
    pub sum: String,
}

/// Equality filter over transactions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub transfer_id: Option<i64>,
}

impl TransactionFilter {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_account(account_id: i64) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    pub fn by_transfer(transfer_id: i64) -> Self {
        Self {
            transfer_id: Some(transfer_id),
            ..Self::default()
        }
    }
}

/// Equality filter over transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransferFilter {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl TransferFilter {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}
