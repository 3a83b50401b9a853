//! The four traits every backend driver implements: [`Driver`],
//! [`Connection`], [`PreparedStatement`] and [`ResultSet`].
//!
//! Each trait comes in two forms, following the pattern established for
//! connection lifecycle checks in this workspace's pool crate:
//!
//! - A native `async fn` trait (`Driver`, `Connection`, ...) for the
//!   zero-overhead call path when a concrete type is known.
//! - An object-safe `#[async_trait]` mirror (`DynDriver`, `DynConnection`,
//!   ...) for storage behind a `Box<dyn _>` — the registry and the pool
//!   only ever see the `Dyn*` forms, since they hold heterogeneous driver
//!   types side by side.
//!
//! A blanket implementation derives the `Dyn*` form for any type
//! implementing the native trait, so driver authors only implement the
//! native trait.
//!
//! This crate only defines contracts. No wire protocol, SQL dialect, or
//! concrete backend lives here; see `cpp-dbc-testkit` for an in-memory
//! reference implementation used by this workspace's own tests.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod connection;
mod driver;
mod options;
mod result_set;
mod statement;

pub use connection::{Connection, DynConnection};
pub use driver::{Driver, DynDriver};
pub use options::ConnectionOptions;
pub use result_set::{DynResultSet, ResultSet};
pub use statement::{DynPreparedStatement, PreparedStatement};
