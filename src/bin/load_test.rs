//! Load Testing Tool
//!
//! Fires concurrent transfers in both directions between two fresh accounts
//! and checks that no money was created or lost.
//!
//! Run with: cargo run --bin load_test --release -- --transfers 1000 --concurrency 16

use std::sync::Arc;
use std::time::Instant;

use simple_bank::domain::{CreateAccountParams, OperationContext, TransferTxnParams};
use simple_bank::{db, Config, PgStore, Store};
use tokio::sync::Semaphore;

fn arg_or(args: &[String], flag: &str, default: u64) -> u64 {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let transfer_count = arg_or(&args, "--transfers", 1000);
    let concurrency = arg_or(&args, "--concurrency", 16) as usize;

    let config = Config::from_env()?;

    println!(
        "Load Test - {} transfers, {} in flight",
        transfer_count, concurrency
    );
    println!("Connecting to database...");

    let pool = db::connect(&config).await?;
    db::run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    // Owner ids derived from the clock so repeated runs do not collide
    let owner = chrono::Utc::now().timestamp_micros();
    let opening_balance = 1_000_000;
    let mut accounts = Vec::with_capacity(2);
    for user_id in [owner, owner + 1] {
        let account = store
            .create_account(CreateAccountParams {
                user_id,
                currency: "USD".to_string(),
                balance: opening_balance,
            })
            .await?;
        accounts.push(account);
    }
    let (a, b) = (accounts[0].id, accounts[1].id);

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let start = Instant::now();
    let mut handles = Vec::with_capacity(transfer_count as usize);

    for i in 0..transfer_count {
        let store = store.clone();
        let permit = permits.clone().acquire_owned().await?;
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            store
                .transfer_txn(TransferTxnParams::new(from, to, 1), &OperationContext::new())
                .await
        }));
    }

    let mut success_count = 0u64;
    for handle in handles {
        match handle.await? {
            Ok(_) => success_count += 1,
            Err(e) => eprintln!("Transfer failed: {}", e),
        }
    }

    let elapsed = start.elapsed();
    let rate = success_count as f64 / elapsed.as_secs_f64();

    let balance_a = store.get_account(a).await?.balance;
    let balance_b = store.get_account(b).await?.balance;

    println!("\n=== Load Test Results ===");
    println!("Total transfers: {}", transfer_count);
    println!("Successful: {}", success_count);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {:.0} transfers/sec", rate);
    println!("Balances: {} / {}", balance_a, balance_b);

    if balance_a + balance_b != 2 * opening_balance {
        anyhow::bail!("Ledger out of balance");
    }

    Ok(())
}
