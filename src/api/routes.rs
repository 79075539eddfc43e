//! API Routes
//!
//! HTTP endpoint definitions. Single-resource routes load the resource,
//! then check that the caller owns it.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthUser};
use crate::domain::{
    Account, AccountBalance, DomainError, OperationContext, Transaction, TransactionFilter,
    Transfer, TransferFilter, UserSummary,
};
use crate::error::AppResult;
use crate::handlers::{AccountCommand, TransactionCommand, TransactionPatch, TransferCommand, UserCommand};
use crate::store::NOT_OWNER;

use super::extract::JsonBody;
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Query-string filters for `GET /transactions`
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub status: Option<bool>,
}

impl From<TransactionQuery> for TransactionFilter {
    fn from(query: TransactionQuery) -> Self {
        Self {
            account_id: query.account_id,
            status: query.status,
            ..Self::default()
        }
    }
}

// =========================================================================
// Routers
// =========================================================================

/// Routes that need no token
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
}

/// Routes behind the bearer-token middleware
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).put(update_account).delete(remove_account),
        )
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(remove_transaction),
        )
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route(
            "/transfers/:id",
            get(get_transfer).put(update_transfer).delete(remove_transfer),
        )
        .route("/balance", get(get_balance))
}

async fn health_check() -> &'static str {
    "OK"
}

// =========================================================================
// Auth
// =========================================================================

async fn sign_up(
    State(state): State<AppState>,
    JsonBody(command): JsonBody<UserCommand>,
) -> AppResult<(StatusCode, Json<UserSummary>)> {
    let user = state.users.save(&command).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn sign_in(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignInRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let token = auth::sign_in(&state.users, &state.tokens, &email, &password).await?;
    Ok(Json(TokenResponse { token }))
}

// =========================================================================
// Users
// =========================================================================

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.users.find_all().await?))
}

async fn create_user(
    State(state): State<AppState>,
    JsonBody(command): JsonBody<UserCommand>,
) -> AppResult<(StatusCode, Json<UserSummary>)> {
    let user = state.users.save(&command).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// =========================================================================
// Accounts
// =========================================================================

async fn list_accounts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list(user.id).await?))
}

async fn create_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(command): JsonBody<AccountCommand>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let account = state.accounts.create(user.id, &command).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<Account>> {
    Ok(Json(state.accounts.get_by_id(user.id, id).await?))
}

async fn update_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    JsonBody(command): JsonBody<AccountCommand>,
) -> AppResult<Json<Account>> {
    Ok(Json(state.accounts.update(user.id, id, &command).await?))
}

async fn remove_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.accounts.remove(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Transactions
// =========================================================================

/// Load a transaction the caller may touch.
async fn owned_transaction(state: &AppState, user_id: i64, id: i64) -> AppResult<Transaction> {
    let transaction = state
        .ledger
        .find_one(&TransactionFilter::by_id(id))
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Transaction #{} not found", id)))?;

    let owner = state
        .accounts
        .find_one(transaction.account_id)
        .await?
        .map(|account| account.user_id);
    if owner != Some(user_id) {
        return Err(DomainError::forbidden(NOT_OWNER).into());
    }

    Ok(transaction)
}

/// Transfer postings only change through their transfer.
fn ensure_standalone(transaction: &Transaction) -> Result<(), DomainError> {
    if transaction.is_transfer_posting() {
        return Err(DomainError::conflict(
            "This transaction is part of a transfer; change the transfer instead",
        ));
    }
    Ok(())
}

async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Vec<Transaction>>> {
    let filter = TransactionFilter::from(query);
    Ok(Json(state.ledger.find(user.id, &filter).await?))
}

async fn create_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(command): JsonBody<TransactionCommand>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let transaction = command.validate()?;
    state.accounts.get_by_id(user.id, transaction.account_id).await?;

    let stored = state.ledger.save(&command).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<Transaction>> {
    Ok(Json(owned_transaction(&state, user.id, id).await?))
}

async fn update_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    JsonBody(patch): JsonBody<TransactionPatch>,
) -> AppResult<Json<Transaction>> {
    let current = owned_transaction(&state, user.id, id).await?;
    ensure_standalone(&current)?;

    if let Some(account_id) = patch.account_id {
        state.accounts.get_by_id(user.id, account_id).await?;
    }
    if patch.is_empty() {
        return Ok(Json(current));
    }

    let updated = state
        .ledger
        .update(id, &patch)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Transaction #{} not found", id)))?;
    Ok(Json(updated))
}

async fn remove_transaction(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let current = owned_transaction(&state, user.id, id).await?;
    ensure_standalone(&current)?;

    state.ledger.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Transfers
// =========================================================================

async fn owned_transfer(state: &AppState, user_id: i64, id: i64) -> AppResult<Transfer> {
    let transfer = state
        .transfers
        .find_one(&TransferFilter::by_id(id))
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Transfer #{} not found", id)))?;

    if transfer.user_id != user_id {
        return Err(DomainError::forbidden(NOT_OWNER).into());
    }
    Ok(transfer)
}

async fn list_transfers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Transfer>>> {
    Ok(Json(state.transfers.find(&TransferFilter::by_user(user.id)).await?))
}

async fn create_transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(context): Extension<OperationContext>,
    JsonBody(command): JsonBody<TransferCommand>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    let transfer = state.transfers.validate(&command.with_user(user.id)).await?;
    let stored = state.transfers.save(&transfer, &context).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<Transfer>> {
    Ok(Json(owned_transfer(&state, user.id, id).await?))
}

async fn update_transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<i64>,
    JsonBody(command): JsonBody<TransferCommand>,
) -> AppResult<Json<Transfer>> {
    owned_transfer(&state, user.id, id).await?;

    let transfer = state.transfers.validate(&command.with_user(user.id)).await?;
    let updated = state
        .transfers
        .update(id, &transfer, &context)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Transfer #{} not found", id)))?;
    Ok(Json(updated))
}

async fn remove_transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    owned_transfer(&state, user.id, id).await?;

    state.transfers.remove(id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Balance
// =========================================================================

async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<AccountBalance>>> {
    Ok(Json(state.balances.balance_now(user.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::domain::Direction;
    use rust_decimal_macros::dec;

    fn posting(transfer_id: Option<i64>) -> Transaction {
        Transaction {
            id: 1,
            description: "T1".to_string(),
            direction: Direction::Inflow,
            date: Utc::now(),
            amount: dec!(100.00),
            account_id: 10000,
            status: true,
            transfer_id,
        }
    }

    #[test]
    fn test_transfer_postings_are_not_standalone() {
        assert!(ensure_standalone(&posting(None)).is_ok());

        let err = ensure_standalone(&posting(Some(3))).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn test_transaction_query_into_filter() {
        let filter = TransactionFilter::from(TransactionQuery {
            account_id: Some(10100),
            status: Some(true),
        });
        assert_eq!(filter.account_id, Some(10100));
        assert_eq!(filter.status, Some(true));
        assert_eq!(filter.id, None);
        assert_eq!(filter.transfer_id, None);
    }
}
