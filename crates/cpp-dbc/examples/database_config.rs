//! Named database configuration example.
//!
//! Demonstrates registering a [`DatabaseConfig`] and a [`PoolConfig`] under
//! names, then asking a [`DatabaseConfigManager`] to build a running pool
//! from that pair — the pattern an application's own YAML/TOML loader would
//! feed at startup (config-file parsing itself stays out of scope here; see
//! spec.md §1).
//!
//! This example registers the in-memory reference driver from
//! `cpp-dbc-testkit` rather than connecting to a real backend, so it runs
//! standalone with `cargo run --example database_config`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use cpp_dbc::{Connection, DatabaseConfig, DatabaseConfigManager, DriverRegistry, PoolConfig};
use cpp_dbc_testkit::MemoryDriver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    DriverRegistry::register(Arc::new(MemoryDriver));

    println!("=== Named Database Configuration Example ===\n");

    let mut manager = DatabaseConfigManager::new();
    manager.add_database_config(
        DatabaseConfig::new("orders", "memory", "", 0, "database-config-example", "app", "secret")
            .option("charset", "utf8mb4"),
    );
    manager.add_pool_config(PoolConfig::new().name("default").initial_size(2).max_size(5));

    let db = manager.database_by_name("orders").expect("just registered");
    println!("derived connection string: {}", db.connection_string());

    let pool = manager.create_pool("orders", "default").await?;
    println!(
        "pool status: active={} idle={} total={}",
        pool.active_count(),
        pool.idle_count(),
        pool.total_count()
    );

    let conn = pool.get_connection().await?;
    conn.execute_update("CREATE TABLE customers (id INTEGER, name TEXT)")
        .await?;
    conn.execute_update("INSERT INTO customers (id, name) VALUES (1, 'grace')")
        .await?;
    let mut rs = conn.execute_query("SELECT * FROM customers").await?;
    while rs.next().await? {
        println!("  row: id={:?} name={:?}", rs.get(1)?, rs.get(2)?);
    }
    drop(conn);

    pool.close().await;
    println!("\npool closed: running = {}", pool.is_running());

    Ok(())
}
