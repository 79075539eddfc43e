//! Common test utilities
//!
//! Tests need a Postgres database in `DATABASE_URL`. Rows are never
//! truncated; each test signs up its own users with unique emails so tests
//! can run side by side.

#![allow(dead_code)]

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use finance_ledger::api::{build_router, AppState};
use finance_ledger::auth::TokenService;
use finance_ledger::db;
use finance_ledger::domain::{Account, UserSummary};
use finance_ledger::handlers::{AccountCommand, UserCommand};
use finance_ledger::store::{AccountStore, UserDirectory};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "123456";

/// Connect and apply migrations.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@mail.com", prefix, Uuid::new_v4())
}

pub fn tokens() -> TokenService {
    TokenService::new(TEST_SECRET, 60)
}

pub fn app(pool: PgPool) -> Router {
    build_router(AppState::new(pool, tokens()))
}

pub async fn create_user(pool: &PgPool, name: &str) -> UserSummary {
    UserDirectory::new(pool.clone())
        .save(&UserCommand::new(name, &unique_email(name), TEST_PASSWORD))
        .await
        .expect("Failed to create user")
}

pub async fn create_account(pool: &PgPool, user_id: i64, name: &str) -> Account {
    AccountStore::new(pool.clone())
        .create(user_id, &AccountCommand::new(name))
        .await
        .expect("Failed to create account")
}
