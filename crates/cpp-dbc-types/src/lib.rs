//! Shared scalar types for the `cpp_dbc` workspace.
//!
//! This crate has no dependency on any other `cpp_dbc` crate: it exists so
//! that `cpp-dbc-driver`, `cpp-dbc-pool` and `cpp-dbc-txn` can all speak the
//! same [`Value`], [`IsolationLevel`] and [`DriverFamily`] vocabulary without
//! depending on each other.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod family;
mod isolation;
mod value;

pub use family::DriverFamily;
pub use isolation::IsolationLevel;
pub use value::{Timestamp, Value};
