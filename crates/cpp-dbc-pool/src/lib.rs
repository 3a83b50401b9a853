//! The `cpp_dbc` connection pool: construction, borrow/return, background
//! maintenance and shutdown over relational `PhysicalConnection`s obtained
//! through `cpp-dbc-registry`.
//!
//! This is the core subsystem of the workspace: everything else (the
//! registry, the driver contracts) exists to support what lives here, and
//! the transaction manager (`cpp-dbc-txn`) is built directly on top of
//! [`ConnectionPool`]/[`PooledConnection`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod config;
mod pool;
mod pooled;
mod slot;

pub use config::{ConfigError, PoolConfig, DEFAULT_VALIDATION_INTERVAL, DEFAULT_VALIDATION_QUERY};
pub use pool::{ConnectionPool, PoolStatus};
pub use pooled::PooledConnection;
