//! Shared application state

use sqlx::PgPool;

use crate::auth::TokenService;
use crate::handlers::TransferHandler;
use crate::projection::BalanceAggregator;
use crate::store::{AccountStore, TransactionLedger, UserDirectory};

/// Services handed to every request. They share one pool.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: UserDirectory,
    pub accounts: AccountStore,
    pub ledger: TransactionLedger,
    pub transfers: TransferHandler,
    pub balances: BalanceAggregator,
}

impl AppState {
    pub fn new(pool: PgPool, tokens: TokenService) -> Self {
        Self {
            tokens,
            users: UserDirectory::new(pool.clone()),
            accounts: AccountStore::new(pool.clone()),
            ledger: TransactionLedger::new(pool.clone()),
            transfers: TransferHandler::new(pool.clone()),
            balances: BalanceAggregator::new(pool),
        }
    }
}
