//! Transaction manager example.
//!
//! Demonstrates beginning a transaction, handing its pinned connection to
//! another task by id, committing, and what happens when code tries to use
//! an id after it has already been committed.
//!
//! Registers the in-memory reference driver from `cpp-dbc-testkit` rather
//! than connecting to a real backend, so it runs standalone with
//! `cargo run --example transaction_manager`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use cpp_dbc_driver::{Connection, DynResultSet};
use cpp_dbc_pool::{ConnectionPool, PoolConfig};
use cpp_dbc_registry::DriverRegistry;
use cpp_dbc_testkit::MemoryDriver;
use cpp_dbc_txn::TransactionManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    DriverRegistry::register(Arc::new(MemoryDriver));

    println!("=== Transaction Manager Example ===\n");

    let pool = ConnectionPool::create(
        PoolConfig::new()
            .name("txn-example-pool")
            .url("cpp_dbc:memory://txn-example")
            .initial_size(2)
            .min_idle(2)
            .max_size(10),
    )
    .await?;

    {
        let conn = pool.get_connection().await?;
        conn.execute_update("CREATE TABLE ledger (id INTEGER, amount INTEGER)")
            .await?;
    }

    let manager = TransactionManager::with_default_timeout(pool.clone());

    println!("1. Opening a transaction:");
    let txn_id = manager.begin_transaction().await?;
    println!("  transaction id: {txn_id}");

    println!("\n2. Handing the id to another task to run a statement:");
    let manager_clone = manager.clone();
    let id_clone = txn_id.clone();
    tokio::spawn(async move {
        let conn = manager_clone
            .get_transaction_connection(&id_clone)
            .await
            .expect("transaction still open");
        conn.execute_update("INSERT INTO ledger (id, amount) VALUES (1, 100)")
            .await
            .expect("insert");
        println!("  other task inserted a row on the pinned connection");
    })
    .await?;

    println!("\n3. Committing:");
    manager.commit_transaction(&txn_id).await?;
    println!("  active transactions now: {}", manager.active_transaction_count().await);

    println!("\n4. Using the id again now fails:");
    match manager.get_transaction_connection(&txn_id).await {
        Ok(_) => println!("  unexpectedly still open"),
        Err(err) => println!("  {err}"),
    }

    {
        let conn = pool.get_connection().await?;
        let mut rs = conn.execute_query("SELECT * FROM ledger").await?;
        println!("\n5. Reading back what was committed:");
        while rs.next().await? {
            println!("  row: id={:?} amount={:?}", rs.get(1)?, rs.get(2)?);
        }
    }

    manager.close().await;
    pool.close().await;
    Ok(())
}
