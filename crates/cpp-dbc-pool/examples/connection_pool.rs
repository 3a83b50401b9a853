//! Connection pooling example.
//!
//! Demonstrates pool construction, a basic borrow/use/return cycle, a burst
//! of concurrent borrows, and reading back the pool's live statistics.
//!
//! This example registers the in-memory reference driver from
//! `cpp-dbc-testkit` rather than connecting to a real backend, so it runs
//! standalone with `cargo run --example connection_pool`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use cpp_dbc_driver::Connection;
use cpp_dbc_pool::{ConnectionPool, PoolConfig};
use cpp_dbc_registry::DriverRegistry;
use cpp_dbc_testkit::MemoryDriver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    DriverRegistry::register(Arc::new(MemoryDriver));

    println!("=== Connection Pool Example ===\n");

    let config = PoolConfig::new()
        .name("example-pool")
        .url("cpp_dbc:memory://example-pool")
        .initial_size(2)
        .min_idle(2)
        .max_size(10)
        .connection_timeout(Duration::from_secs(5));

    println!("Pool configuration:");
    println!("  initial_size: {}", config.initial_size);
    println!("  max_size:     {}", config.max_size);
    println!("  min_idle:     {}", config.min_idle);
    println!();

    let pool = ConnectionPool::create(config).await?;
    print_status(&pool);

    println!("\n1. Basic borrow/use/return:");
    {
        let conn = pool.get_connection().await?;
        conn.execute_update("CREATE TABLE accounts (id INTEGER, name TEXT)")
            .await?;
        conn.execute_update("INSERT INTO accounts (id, name) VALUES (1, 'ada')")
            .await?;
        let mut rs = conn.execute_query("SELECT * FROM accounts").await?;
        while rs.next().await? {
            println!("  row: id={:?} name={:?}", rs.get(1)?, rs.get(2)?);
        }
        // Dropping `conn` here returns it to the pool.
    }
    print_status(&pool);

    println!("\n2. Concurrent borrows (5 parallel tasks):");
    let mut tasks = Vec::new();
    for i in 0..5 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let conn = pool.get_connection().await.expect("borrow");
            conn.execute_query("SELECT 1").await.expect("ping");
            println!("  task {i} completed a round-trip");
        }));
    }
    for task in tasks {
        task.await.expect("task panicked");
    }
    print_status(&pool);

    println!("\n3. Shutting down...");
    pool.close().await;
    println!("  pool closed: running = {}", pool.is_running());

    Ok(())
}

fn print_status(pool: &ConnectionPool) {
    let status = pool.status();
    println!(
        "  pool status: active={} idle={} total={} running={}",
        status.active, status.idle, status.total, status.running
    );
}
