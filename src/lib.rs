//! finance_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod projection;
pub mod store;

pub use config::Config;
pub use domain::{Direction, DomainError, OperationContext};
pub use error::{AppError, AppResult};
