//! Command definitions
//!
//! Commands are the loosely-typed request payloads. Each one validates into
//! a typed value before any store access; checks run in a fixed order and
//! the first failure is reported.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{normalize_amount, to_money, Direction, DomainError};

/// Longest name, email or description the schema stores (`VARCHAR(255)`).
pub const MAX_TEXT_LEN: usize = 255;

/// Amounts must stay below this magnitude to fit `NUMERIC(15, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_316_134_912, 2_328, 0, false, 0);

/// Present and not blank
fn required_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn within_length(value: &str, field: &str) -> Result<(), DomainError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(())
}

/// Present and non-zero at cent precision. A zero amount counts as missing.
fn required_amount(value: Option<Decimal>) -> Option<Decimal> {
    value.map(to_money).filter(|amount| !amount.is_zero())
}

fn within_bounds(amount: Decimal) -> Result<Decimal, DomainError> {
    if to_money(amount).abs() >= MAX_AMOUNT {
        return Err(DomainError::validation("Value is too large"));
    }
    Ok(amount)
}

/// Parse a direction code. Anything but the strings `I` and `O` is invalid,
/// including non-string JSON values.
fn parse_direction(value: &Value) -> Result<Direction, DomainError> {
    value
        .as_str()
        .ok_or_else(|| DomainError::validation("Invalid type"))?
        .trim()
        .parse()
        .map_err(|e: crate::domain::InvalidDirection| DomainError::validation(e.to_string()))
}

/// A present, non-null, non-blank direction value
fn required_direction(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

// =========================================================================
// Accounts
// =========================================================================

/// Payload for creating an account or renaming one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountCommand {
    #[serde(default)]
    pub name: Option<String>,
}

impl AccountCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn validate(&self) -> Result<String, DomainError> {
        let name = required_text(self.name.as_deref())
            .ok_or_else(|| DomainError::validation("Name is a required attribute"))?;
        within_length(name, "Name")?;
        Ok(name.to_string())
    }
}

// =========================================================================
// Transactions
// =========================================================================

/// Payload for creating a standalone transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionCommand {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_id: Option<i64>,
    /// Direction code, `I` or `O`. Kept as raw JSON so a mistyped value
    /// fails validation as an invalid type.
    #[serde(default, rename = "type")]
    pub direction: Option<Value>,
    #[serde(default)]
    pub status: Option<bool>,
}

/// A transaction that passed validation, amount already sign-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub account_id: i64,
    pub direction: Direction,
    pub status: bool,
    pub transfer_id: Option<i64>,
}

impl TransactionCommand {
    pub fn validate(&self) -> Result<NewTransaction, DomainError> {
        let description = required_text(self.description.as_deref())
            .ok_or_else(|| DomainError::validation("Description is a required attribute"))?;
        within_length(description, "Description")?;
        let amount = required_amount(self.amount)
            .ok_or_else(|| DomainError::validation("Value is a required attribute"))?;
        let amount = within_bounds(amount)?;
        let date = self
            .date
            .ok_or_else(|| DomainError::validation("Date is a required attribute"))?;
        let account_id = self
            .account_id
            .ok_or_else(|| DomainError::validation("Account is a required attribute"))?;
        let direction = required_direction(self.direction.as_ref())
            .ok_or_else(|| DomainError::validation("Type is a required attribute"))?;
        let direction = parse_direction(direction)?;

        Ok(NewTransaction {
            description: description.to_string(),
            amount: normalize_amount(amount, direction),
            date,
            account_id,
            direction,
            status: self.status.unwrap_or(false),
            transfer_id: None,
        })
    }
}

/// Partial update of a transaction. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default, rename = "type")]
    pub direction: Option<Value>,
    #[serde(default)]
    pub status: Option<bool>,
}

impl TransactionPatch {
    /// Check the fields that were sent and return the parsed direction, if
    /// any. Absent fields are not required.
    pub fn validate(&self) -> Result<Option<Direction>, DomainError> {
        if let Some(description) = self.description.as_deref() {
            let description = required_text(Some(description))
                .ok_or_else(|| DomainError::validation("Description is a required attribute"))?;
            within_length(description, "Description")?;
        }
        if let Some(amount) = self.amount {
            within_bounds(amount)?;
        }
        self.direction.as_ref().map(parse_direction).transpose()
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.account_id.is_none()
            && self.direction.is_none()
            && self.status.is_none()
    }
}

// =========================================================================
// Transfers
// =========================================================================

/// Payload for creating or replacing a transfer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferCommand {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_account_id: Option<i64>,
    #[serde(default)]
    pub destination_account_id: Option<i64>,
    /// Declared owner; the API layer overwrites it with the caller
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Transfer fields after the field-level checks. Account ownership is
/// checked separately against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub description: String,
    /// Positive magnitude
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub source_account_id: i64,
    pub destination_account_id: i64,
    pub user_id: i64,
}

impl TransferCommand {
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn validate_fields(&self) -> Result<NewTransfer, DomainError> {
        let description = required_text(self.description.as_deref())
            .ok_or_else(|| DomainError::validation("Description is a required attribute"))?;
        within_length(description, "Description")?;
        let amount = required_amount(self.amount)
            .ok_or_else(|| DomainError::validation("Value is a required attribute"))?;
        let amount = within_bounds(amount)?;
        let date = self
            .date
            .ok_or_else(|| DomainError::validation("Date is a required attribute"))?;
        let source_account_id = self
            .source_account_id
            .ok_or_else(|| DomainError::validation("Source Account is a required attribute"))?;
        let destination_account_id = self
            .destination_account_id
            .ok_or_else(|| DomainError::validation("Target Account is a required attribute"))?;
        if source_account_id == destination_account_id {
            return Err(DomainError::validation(
                "It is not possible to transfer from an account to itself",
            ));
        }
        let user_id = self
            .user_id
            .ok_or_else(|| DomainError::validation("User is a required attribute"))?;

        Ok(NewTransfer {
            description: description.to_string(),
            amount: amount.abs(),
            date,
            source_account_id,
            destination_account_id,
            user_id,
        })
    }
}

// =========================================================================
// Users
// =========================================================================

/// Sign-up payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCommand {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Validated sign-up data; `password` is still plain text here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl UserCommand {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    pub fn validate(&self) -> Result<NewUser, DomainError> {
        let name = required_text(self.name.as_deref())
            .ok_or_else(|| DomainError::validation("Name is a required attribute"))?;
        within_length(name, "Name")?;
        let email = required_text(self.email.as_deref())
            .ok_or_else(|| DomainError::validation("E-mail is a required attribute"))?;
        within_length(email, "E-mail")?;
        // Passwords are not trimmed; only an absent or empty one is rejected.
        // The stored value is a fixed-size hash, so no length limit applies.
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DomainError::validation("Password is a required attribute"))?;

        Ok(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}
