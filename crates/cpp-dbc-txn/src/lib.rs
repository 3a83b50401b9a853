//! The cpp_dbc transaction manager.
//!
//! Pins a [`PooledConnection`](cpp_dbc_pool::PooledConnection) to an opaque
//! id so callers that can't thread a borrow through a single call stack —
//! a request handled across several async tasks, or explicitly across
//! threads — can still run a multi-statement transaction against one
//! physical session. A background sweep rolls back and releases any
//! transaction left open past its timeout.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod manager;

pub use manager::{TransactionManager, DEFAULT_TRANSACTION_TIMEOUT};
