//! Projection module
//!
//! Read-only views derived from the transactions table.

mod balance;

pub use balance::{BalanceAggregator, BalanceRow};
