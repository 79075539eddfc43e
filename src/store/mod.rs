//! Store module
//!
//! Repositories over the Postgres tables.

mod account_store;
mod transaction_ledger;
mod user_directory;

pub(crate) use account_store::NOT_OWNER;
pub use account_store::AccountStore;
pub use transaction_ledger::TransactionLedger;
pub use user_directory::{UserDirectory, UserFilter};
