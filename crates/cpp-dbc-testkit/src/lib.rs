//! In-memory `Connection`/`Driver`/`ResultSet`/`PreparedStatement`
//! implementations used across this workspace's test suites.
//!
//! Nothing here touches a network or a real database: `memory:` and
//! `memcolumnar:` are toy backends that live entirely in process memory,
//! good enough to exercise a connection pool's borrow/return/validate cycle
//! and a transaction manager's commit/rollback visibility rules against
//! something real, without the flakiness of an external service.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod connection;
mod driver;
mod engine;
mod result_set;
mod sql;
mod statement;

pub use connection::MemoryConnection;
pub use driver::{MemoryColumnarDriver, MemoryDriver};
pub use engine::reset_backend;
pub use result_set::MemoryResultSet;
pub use statement::MemoryStatement;

use engine::backend_for;

/// Opens a [`MemoryConnection`] directly against `url`, bypassing the
/// driver registry. Intended for unit tests in other crates that need a
/// working `Connection` without registering a driver first; tests that
/// exercise registry-based dispatch should register [`MemoryDriver`]
/// instead and connect through `cpp-dbc-registry`.
#[must_use]
pub fn memory_connection(url: &str) -> MemoryConnection {
    MemoryConnection::new(url, backend_for(url))
}
