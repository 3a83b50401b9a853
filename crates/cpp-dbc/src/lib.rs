//! # cpp-dbc
//!
//! Driver-agnostic async connection pool and transaction manager, with named
//! database configuration.
//!
//! This is the facade crate: it re-exports the public surface of the
//! workspace's lower-level crates so a consumer depends on one crate instead
//! of six, and adds [`config::DatabaseConfig`]/[`config::DatabaseConfigManager`]
//! — named configuration lookup, consumed as already-parsed values (no
//! YAML/TOML loading lives here; that stays an application concern).
//!
//! ## Example
//!
//! ```rust,ignore
//! use cpp_dbc::{ConnectionPool, DatabaseConfig, DatabaseConfigManager, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut manager = DatabaseConfigManager::new();
//!     manager.add_database_config(DatabaseConfig::new(
//!         "orders", "mysql", "localhost", 3306, "orders", "app", "secret",
//!     ));
//!     manager.add_pool_config(PoolConfig::new().name("default").max_size(10));
//!
//!     let pool = manager.create_pool("orders", "default").await?;
//!     let conn = pool.get_connection().await?;
//!     conn.execute_query("SELECT 1").await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;

pub use cpp_dbc_driver::{
    Connection, ConnectionOptions, Driver, DynConnection, DynDriver, DynPreparedStatement,
    DynResultSet, PreparedStatement, ResultSet,
};
pub use cpp_dbc_error::DbError;
pub use cpp_dbc_pool::{ConfigError, ConnectionPool, PoolConfig, PoolStatus, PooledConnection};
pub use cpp_dbc_registry::DriverRegistry;
pub use cpp_dbc_txn::{TransactionManager, DEFAULT_TRANSACTION_TIMEOUT};
pub use cpp_dbc_types::{DriverFamily, IsolationLevel, Timestamp, Value};

pub use config::{DatabaseConfig, DatabaseConfigManager, DEFAULT_POOL_CONFIG_NAME};
