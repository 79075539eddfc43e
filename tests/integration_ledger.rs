//! Ledger integration tests against Postgres

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use finance_ledger::domain::{
    Direction, DomainError, OperationContext, TransactionFilter, TransferFilter,
};
use finance_ledger::handlers::{
    AccountCommand, TransactionCommand, TransactionPatch, TransferCommand, TransferHandler,
    UserCommand,
};
use finance_ledger::projection::BalanceAggregator;
use finance_ledger::store::{AccountStore, TransactionLedger, UserDirectory, UserFilter};
use finance_ledger::AppError;

mod common;

fn domain_error(result: Result<impl std::fmt::Debug, AppError>) -> DomainError {
    match result {
        Err(AppError::Domain(err)) => err,
        other => panic!("Expected domain error, got: {:?}", other),
    }
}

fn transaction(account_id: i64, amount: Decimal, direction: &str, status: bool) -> TransactionCommand {
    TransactionCommand {
        description: Some("T1".to_string()),
        amount: Some(amount),
        date: Some(Utc::now() - Duration::days(1)),
        account_id: Some(account_id),
        direction: Some(direction.into()),
        status: Some(status),
    }
}

fn transfer(user_id: i64, source: i64, destination: i64, amount: Decimal) -> TransferCommand {
    TransferCommand {
        description: Some("Regular Transfer".to_string()),
        amount: Some(amount),
        date: Some(Utc::now()),
        source_account_id: Some(source),
        destination_account_id: Some(destination),
        user_id: Some(user_id),
    }
}

#[tokio::test]
async fn test_saved_amount_sign_follows_direction() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "sign").await;
    let account = common::create_account(&pool, user.id, "Acc #1").await;
    let ledger = TransactionLedger::new(pool.clone());

    let inflow = ledger
        .save(&transaction(account.id, dec!(-100), "I", true))
        .await
        .unwrap();
    assert_eq!(inflow.amount.to_string(), "100.00");
    assert_eq!(inflow.direction, Direction::Inflow);

    let outflow = ledger
        .save(&transaction(account.id, dec!(100), "O", true))
        .await
        .unwrap();
    assert_eq!(outflow.amount.to_string(), "-100.00");

    let err = domain_error(ledger.save(&transaction(account.id, dec!(100), "A", true)).await);
    assert_eq!(err.to_string(), "Invalid type");
}

#[tokio::test]
async fn test_transaction_update_and_remove() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "patch").await;
    let account = common::create_account(&pool, user.id, "Acc #1").await;
    let ledger = TransactionLedger::new(pool.clone());

    let saved = ledger
        .save(&transaction(account.id, dec!(50), "I", false))
        .await
        .unwrap();

    // Direction flip alone re-signs the stored amount
    let flipped = ledger
        .update(
            saved.id,
            &TransactionPatch {
                direction: Some("O".into()),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flipped.amount, dec!(-50));
    assert_eq!(flipped.direction, Direction::Outflow);

    // Amount alone keeps the stored direction and its sign
    let resized = ledger
        .update(
            saved.id,
            &TransactionPatch {
                amount: Some(dec!(75)),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resized.amount, dec!(-75));
    assert_eq!(resized.direction, Direction::Outflow);

    let renamed = ledger
        .update(
            saved.id,
            &TransactionPatch {
                description: Some("Updated".to_string()),
                status: Some(true),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.description, "Updated");
    assert!(renamed.status);
    assert_eq!(renamed.amount, dec!(-75));

    assert_eq!(ledger.remove(saved.id).await.unwrap(), 1);
    assert_eq!(ledger.remove(saved.id).await.unwrap(), 0);
    assert!(ledger
        .find_one(&TransactionFilter::by_id(saved.id))
        .await
        .unwrap()
        .is_none());
    assert!(ledger
        .update(saved.id, &TransactionPatch::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_find_is_scoped_to_user() {
    let pool = common::setup_test_db().await;
    let owner = common::create_user(&pool, "owner").await;
    let other = common::create_user(&pool, "other").await;
    let account = common::create_account(&pool, owner.id, "Acc #1").await;
    let other_account = common::create_account(&pool, other.id, "Acc #1").await;
    let ledger = TransactionLedger::new(pool.clone());

    ledger.save(&transaction(account.id, dec!(10), "I", true)).await.unwrap();
    ledger.save(&transaction(account.id, dec!(20), "I", false)).await.unwrap();
    ledger.save(&transaction(other_account.id, dec!(30), "I", true)).await.unwrap();

    let all = ledger.find(owner.id, &TransactionFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|t| t.account_id == account.id));

    let confirmed = ledger
        .find(
            owner.id,
            &TransactionFilter {
                status: Some(true),
                ..TransactionFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].amount, dec!(10));
}

#[tokio::test]
async fn test_transfer_lifecycle_keeps_two_postings() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "transfer").await;
    let source = common::create_account(&pool, user.id, "Acc #1").await;
    let destination = common::create_account(&pool, user.id, "Acc #2").await;
    let handler = TransferHandler::new(pool.clone());
    let ledger = TransactionLedger::new(pool.clone());
    let context = OperationContext::new().with_user(user.id);

    let valid = handler
        .validate(&transfer(user.id, source.id, destination.id, dec!(100)))
        .await
        .unwrap();
    let saved = handler.save(&valid, &context).await.unwrap();
    assert_eq!(saved.amount, dec!(100));

    let postings = ledger
        .find_one(&TransactionFilter::by_transfer(saved.id))
        .await
        .unwrap();
    assert!(postings.is_some());

    let postings = ledger
        .find(user.id, &TransactionFilter::by_transfer(saved.id))
        .await
        .unwrap();
    assert_eq!(postings.len(), 2);
    assert_eq!(postings.iter().map(|t| t.amount).sum::<Decimal>(), Decimal::ZERO);
    assert_ne!(postings[0].direction, postings[1].direction);

    let outflow = postings.iter().find(|t| t.direction == Direction::Outflow).unwrap();
    assert_eq!(outflow.account_id, source.id);
    assert_eq!(outflow.description, format!("Transfer to acc #{}", destination.id));
    assert!(outflow.status);

    // Same payload twice still leaves exactly two postings
    let changed = handler
        .validate(&transfer(user.id, source.id, destination.id, dec!(500)))
        .await
        .unwrap();
    for _ in 0..2 {
        let updated = handler.update(saved.id, &changed, &context).await.unwrap().unwrap();
        assert_eq!(updated.amount, dec!(500));
    }
    let postings = ledger
        .find(user.id, &TransactionFilter::by_transfer(saved.id))
        .await
        .unwrap();
    assert_eq!(postings.len(), 2);
    assert!(postings.iter().all(|t| t.amount.abs() == dec!(500)));

    assert!(handler.remove(saved.id, &context).await.unwrap());
    assert!(ledger
        .find(user.id, &TransactionFilter::by_transfer(saved.id))
        .await
        .unwrap()
        .is_empty());
    assert!(handler
        .find_one(&TransferFilter::by_id(saved.id))
        .await
        .unwrap()
        .is_none());

    assert!(handler.update(saved.id, &changed, &context).await.unwrap().is_none());
}

#[tokio::test]
async fn test_transfer_validation_against_store() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "validate").await;
    let intruder = common::create_user(&pool, "intruder").await;
    let own = common::create_account(&pool, user.id, "Acc #1").await;
    let foreign = common::create_account(&pool, intruder.id, "Acc #1").await;
    let handler = TransferHandler::new(pool.clone());

    let err = domain_error(
        handler
            .validate(&transfer(user.id, own.id, own.id, dec!(100)))
            .await,
    );
    assert_eq!(err.to_string(), "It is not possible to transfer from an account to itself");

    let err = domain_error(
        handler
            .validate(&transfer(user.id, own.id, foreign.id, dec!(100)))
            .await,
    );
    assert_eq!(err.to_string(), format!("Account #{} does not belong to the user", foreign.id));

    let err = domain_error(
        handler
            .validate(&transfer(user.id, foreign.id, own.id, dec!(100)))
            .await,
    );
    assert_eq!(err.to_string(), format!("Account #{} does not belong to the user", foreign.id));
}

#[tokio::test]
async fn test_balance_counts_confirmed_past_postings() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "balance").await;
    let first = common::create_account(&pool, user.id, "Acc #1").await;
    let second = common::create_account(&pool, user.id, "Acc #2").await;
    let idle = common::create_account(&pool, user.id, "Acc #3").await;
    let ledger = TransactionLedger::new(pool.clone());
    let balances = BalanceAggregator::new(pool.clone());

    ledger.save(&transaction(first.id, dec!(100), "I", true)).await.unwrap();
    ledger.save(&transaction(first.id, dec!(200), "O", false)).await.unwrap();

    let mut future = transaction(first.id, dec!(1000), "I", true);
    future.date = Some(Utc::now() + Duration::days(30));
    ledger.save(&future).await.unwrap();

    ledger.save(&transaction(second.id, dec!(100), "O", true)).await.unwrap();
    ledger.save(&transaction(idle.id, dec!(50), "I", false)).await.unwrap();

    let balance = balances.balance_now(user.id).await.unwrap();
    assert_eq!(balance.len(), 2);
    assert_eq!(balance[0].id, first.id);
    assert_eq!(balance[0].sum, "100.00");
    assert_eq!(balance[1].id, second.id);
    assert_eq!(balance[1].sum, "-100.00");

    let later = balances
        .balance(user.id, Utc::now() + Duration::days(60))
        .await
        .unwrap();
    assert_eq!(later[0].sum, "1100.00");
}

#[tokio::test]
async fn test_balance_counts_transfers() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "balance-transfer").await;
    let source = common::create_account(&pool, user.id, "Acc #1").await;
    let destination = common::create_account(&pool, user.id, "Acc #2").await;
    let handler = TransferHandler::new(pool.clone());
    let balances = BalanceAggregator::new(pool.clone());

    let mut command = transfer(user.id, source.id, destination.id, dec!(250));
    command.date = Some(Utc::now() - Duration::days(1));
    let valid = handler.validate(&command).await.unwrap();
    handler.save(&valid, &OperationContext::new()).await.unwrap();

    let balance = balances.balance_now(user.id).await.unwrap();
    assert_eq!(balance.len(), 2);
    assert_eq!(balance[0].id, source.id);
    assert_eq!(balance[0].sum, "-250.00");
    assert_eq!(balance[1].id, destination.id);
    assert_eq!(balance[1].sum, "250.00");
}

#[tokio::test]
async fn test_balance_excludes_other_users() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "balance-own").await;
    let other = common::create_user(&pool, "balance-other").await;
    let account = common::create_account(&pool, user.id, "Acc #1").await;
    let other_account = common::create_account(&pool, other.id, "Acc #1").await;
    let ledger = TransactionLedger::new(pool.clone());
    let balances = BalanceAggregator::new(pool.clone());

    ledger.save(&transaction(account.id, dec!(100), "I", true)).await.unwrap();
    ledger.save(&transaction(other_account.id, dec!(900), "I", true)).await.unwrap();

    let balance = balances.balance_now(user.id).await.unwrap();
    assert_eq!(balance.len(), 1);
    assert_eq!(balance[0].id, account.id);
    assert_eq!(balance[0].sum, "100.00");

    let balance = balances.balance_now(other.id).await.unwrap();
    assert_eq!(balance.len(), 1);
    assert_eq!(balance[0].id, other_account.id);
    assert_eq!(balance[0].sum, "900.00");
}

/// Makes every posting insert on `account_id` fail, until dropped.
struct FailingPostings {
    pool: sqlx::PgPool,
    name: String,
}

impl FailingPostings {
    async fn install(pool: &sqlx::PgPool, account_id: i64) -> Self {
        let name = format!("fail_postings_{}", uuid::Uuid::new_v4().simple());

        sqlx::query(&format!(
            "CREATE FUNCTION {name}() RETURNS trigger AS $$ \
             BEGIN RAISE EXCEPTION 'posting rejected'; END; $$ LANGUAGE plpgsql"
        ))
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(&format!(
            "CREATE TRIGGER {name} BEFORE INSERT ON transactions \
             FOR EACH ROW WHEN (NEW.acc_id = {account_id}) EXECUTE FUNCTION {name}()"
        ))
        .execute(pool)
        .await
        .unwrap();

        Self {
            pool: pool.clone(),
            name,
        }
    }

    async fn remove(self) {
        sqlx::query(&format!("DROP TRIGGER {} ON transactions", self.name))
            .execute(&self.pool)
            .await
            .unwrap();
        sqlx::query(&format!("DROP FUNCTION {}()", self.name))
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_failed_transfer_writes_roll_back() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "rollback").await;
    let source = common::create_account(&pool, user.id, "Acc #1").await;
    let destination = common::create_account(&pool, user.id, "Acc #2").await;
    let handler = TransferHandler::new(pool.clone());
    let ledger = TransactionLedger::new(pool.clone());
    let context = OperationContext::new().with_user(user.id);

    let valid = handler
        .validate(&transfer(user.id, source.id, destination.id, dec!(100)))
        .await
        .unwrap();
    let saved = handler.save(&valid, &context).await.unwrap();

    // The inflow leg fails after the transfer row and the outflow leg are written
    let failing = FailingPostings::install(&pool, destination.id).await;

    let changed = handler
        .validate(&transfer(user.id, source.id, destination.id, dec!(500)))
        .await
        .unwrap();
    let update = handler.update(saved.id, &changed, &context).await;
    let save = handler.save(&changed, &context).await;

    failing.remove().await;

    assert!(matches!(update, Err(AppError::Database(_))));
    assert!(matches!(save, Err(AppError::Database(_))));

    // Only the first transfer exists, unchanged, with its original postings
    let transfers = handler.find(&TransferFilter::by_user(user.id)).await.unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].id, saved.id);
    assert_eq!(transfers[0].amount, dec!(100));

    let postings = ledger.find(user.id, &TransactionFilter::default()).await.unwrap();
    assert_eq!(postings.len(), 2);
    assert!(postings.iter().all(|t| t.transfer_id == Some(saved.id)));
    assert!(postings.iter().all(|t| t.amount.abs() == dec!(100)));
}

#[tokio::test]
async fn test_account_rules() {
    let pool = common::setup_test_db().await;
    let user = common::create_user(&pool, "accounts").await;
    let other = common::create_user(&pool, "accounts").await;
    let store = AccountStore::new(pool.clone());
    let ledger = TransactionLedger::new(pool.clone());

    let account = store.create(user.id, &AccountCommand::new("Wallet")).await.unwrap();

    let err = domain_error(store.create(user.id, &AccountCommand::new("Wallet")).await);
    assert_eq!(err.to_string(), "There is already an account with this name");
    assert!(store.create(other.id, &AccountCommand::new("Wallet")).await.is_ok());

    let err = domain_error(store.get_by_id(other.id, account.id).await);
    assert!(matches!(err, DomainError::Forbidden(_)));
    let err = domain_error(store.get_by_id(user.id, i64::MAX).await);
    assert!(matches!(err, DomainError::NotFound(_)));

    let renamed = store
        .update(user.id, account.id, &AccountCommand::new("Savings"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Savings");

    let posting = ledger
        .save(&transaction(account.id, dec!(10), "I", true))
        .await
        .unwrap();
    let err = domain_error(store.remove(user.id, account.id).await);
    assert_eq!(err.to_string(), "This account has associated transactions");

    ledger.remove(posting.id).await.unwrap();
    store.remove(user.id, account.id).await.unwrap();
    assert!(store.find_one(account.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_user_directory() {
    let pool = common::setup_test_db().await;
    let directory = UserDirectory::new(pool.clone());
    let email = common::unique_email("walter");

    let user = directory
        .save(&UserCommand::new("Walter Mitty", &email, "123456"))
        .await
        .unwrap();
    assert_eq!(user.email, email);

    let stored = directory
        .find_one(&UserFilter::by_email(email.as_str()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, user.id);
    assert_ne!(stored.password, "123456");

    let err = domain_error(
        directory
            .save(&UserCommand::new("Other", &email, "654321"))
            .await,
    );
    assert_eq!(err.to_string(), "There is already a user with this email");

    let by_id = directory.find_one(&UserFilter::by_id(user.id)).await.unwrap().unwrap();
    assert_eq!(by_id.email, email);

    let all = directory.find_all().await.unwrap();
    assert!(all.iter().any(|u| u.id == user.id));
}
