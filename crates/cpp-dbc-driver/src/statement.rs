//! The PreparedStatement contract: positional, 1-based parameter binding.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use cpp_dbc_error::DbError;
use cpp_dbc_types::{Timestamp, Value};
use uuid::Uuid;

use crate::result_set::DynResultSet;

/// A prepared statement with positional, 1-based placeholders.
///
/// Binding is synchronous (it only mutates local parameter state); the three
/// execute methods perform backend I/O and are `async`.
pub trait PreparedStatement: Send + Sync {
    /// Binds `value` at the given 1-based placeholder index, replacing any
    /// previous binding for that index.
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DbError>;

    /// Runs the statement, returning a [`ResultSet`](crate::ResultSet) over
    /// the produced rows.
    #[allow(async_fn_in_trait)]
    async fn execute_query(&mut self) -> Result<Box<dyn DynResultSet>, DbError>;

    /// Runs the statement, returning the number of affected rows. DDL
    /// yields `0`.
    #[allow(async_fn_in_trait)]
    async fn execute_update(&mut self) -> Result<u64, DbError>;

    /// Runs the statement, returning `true` if it produced a result set.
    #[allow(async_fn_in_trait)]
    async fn execute(&mut self) -> Result<bool, DbError>;

    /// Binds an integer at `index`.
    fn set_integer(&mut self, index: usize, value: i32) -> Result<(), DbError> {
        self.bind(index, Value::Integer(value))
    }

    /// Binds a long at `index`.
    fn set_long(&mut self, index: usize, value: i64) -> Result<(), DbError> {
        self.bind(index, Value::Long(value))
    }

    /// Binds a double at `index`.
    fn set_double(&mut self, index: usize, value: f64) -> Result<(), DbError> {
        self.bind(index, Value::Double(value))
    }

    /// Binds a boolean at `index`.
    fn set_boolean(&mut self, index: usize, value: bool) -> Result<(), DbError> {
        self.bind(index, Value::Boolean(value))
    }

    /// Binds a string at `index`.
    fn set_string(&mut self, index: usize, value: impl Into<String>) -> Result<(), DbError>
    where
        Self: Sized,
    {
        self.bind(index, Value::String(value.into()))
    }

    /// Binds a date at `index`.
    fn set_date(&mut self, index: usize, value: NaiveDate) -> Result<(), DbError> {
        self.bind(index, Value::Date(value))
    }

    /// Binds a time-of-day at `index`.
    fn set_time(&mut self, index: usize, value: NaiveTime) -> Result<(), DbError> {
        self.bind(index, Value::Time(value))
    }

    /// Binds a timestamp at `index`.
    fn set_timestamp(&mut self, index: usize, value: Timestamp) -> Result<(), DbError> {
        self.bind(index, Value::Timestamp(value))
    }

    /// Binds a binary payload at `index` (the "blob-object" form: the full
    /// payload is already materialized in memory). There is no
    /// "blob-stream" form here: nothing in this workspace speaks a wire
    /// protocol that would benefit from incremental upload.
    fn set_bytes(&mut self, index: usize, value: Vec<u8>) -> Result<(), DbError> {
        self.bind(index, Value::Bytes(value))
    }

    /// Binds a UUID at `index`. Columnar drivers only.
    fn set_uuid(&mut self, index: usize, value: Uuid) -> Result<(), DbError> {
        self.bind(index, Value::Uuid(value))
    }

    /// Binds an explicit NULL at `index`. The type tag is informational
    /// only (used by drivers that must pick a wire type for an untyped
    /// NULL); it does not change the read-back behavior.
    fn set_null(&mut self, index: usize) -> Result<(), DbError> {
        self.bind(index, Value::Null)
    }
}

/// Object-safe mirror of [`PreparedStatement`] for storage behind `Box<dyn
/// DynPreparedStatement>`.
#[async_trait]
pub trait DynPreparedStatement: Send + Sync {
    /// See [`PreparedStatement::bind`].
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DbError>;
    /// See [`PreparedStatement::execute_query`].
    async fn execute_query(&mut self) -> Result<Box<dyn DynResultSet>, DbError>;
    /// See [`PreparedStatement::execute_update`].
    async fn execute_update(&mut self) -> Result<u64, DbError>;
    /// See [`PreparedStatement::execute`].
    async fn execute(&mut self) -> Result<bool, DbError>;
}

#[async_trait]
impl<T> DynPreparedStatement for T
where
    T: PreparedStatement + 'static,
{
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DbError> {
        PreparedStatement::bind(self, index, value)
    }

    async fn execute_query(&mut self) -> Result<Box<dyn DynResultSet>, DbError> {
        PreparedStatement::execute_query(self).await
    }

    async fn execute_update(&mut self) -> Result<u64, DbError> {
        PreparedStatement::execute_update(self).await
    }

    async fn execute(&mut self) -> Result<bool, DbError> {
        PreparedStatement::execute(self).await
    }
}
