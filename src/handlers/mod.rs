//! Command Handlers module
//!
//! Request payloads and the transfer orchestration built on them.

mod commands;
mod transfer_handler;

pub use commands::*;
pub use transfer_handler::{
    check_account_ownership, transfer_postings, TransferHandler, ValidTransfer,
};
