//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod models;

pub use amount::{format_money, normalize_amount, to_money, Direction, InvalidDirection};
pub use context::OperationContext;
pub use error::DomainError;
pub use models::{
    Account, AccountBalance, Transaction, TransactionFilter, Transfer, TransferFilter, User,
    UserSummary,
};
