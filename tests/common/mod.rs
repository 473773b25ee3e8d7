//! Common test utilities

#![allow(dead_code)]

use rand::Rng;
use simple_bank::domain::{Account, CreateAccountParams};
use simple_bank::{PgStore, Store};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connect to the test database and apply migrations.
///
/// Returns `None` when `DATABASE_URL` is not set so database tests can be
/// skipped on machines without PostgreSQL.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    simple_bank::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Random owner id; accounts are unique per (owner, currency)
pub fn random_owner() -> i64 {
    rand::thread_rng().gen_range(1..i64::MAX)
}

pub fn random_balance() -> i64 {
    rand::thread_rng().gen_range(100..1_000)
}

pub async fn create_account(store: &dyn Store, balance: i64) -> Account {
    store
        .create_account(CreateAccountParams {
            user_id: random_owner(),
            currency: "USD".to_string(),
            balance,
        })
        .await
        .expect("Failed to create account")
}

pub async fn create_random_account(store: &PgStore) -> Account {
    create_account(store, random_balance()).await
}

/// Transfers and entries touching one account
pub async fn ledger_rows(pool: &PgPool, account_id: i64) -> (i64, i64) {
    let transfers: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transfers WHERE from_account_id = $1 OR to_account_id = $1",
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count transfers");

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count entries");

    (transfers, entries)
}

/// Terminate a server process from another connection and wait until it is gone
pub async fn terminate_backend(pool: &PgPool, pid: i32) {
    let terminated: bool = sqlx::query_scalar("SELECT pg_terminate_backend($1)")
        .bind(pid)
        .fetch_one(pool)
        .await
        .expect("Failed to terminate backend");
    assert!(terminated, "backend {pid} was not signalled");

    for _ in 0..50 {
        let alive: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_stat_activity WHERE pid = $1)")
                .bind(pid)
                .fetch_one(pool)
                .await
                .expect("Failed to query pg_stat_activity");
        if !alive {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    panic!("backend {pid} still running");
}
