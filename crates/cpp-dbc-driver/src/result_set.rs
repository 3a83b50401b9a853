//! The ResultSet contract: a lazy, forward-only cursor over query rows.

use async_trait::async_trait;
use cpp_dbc_error::DbError;
use cpp_dbc_types::{Timestamp, Value};
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

/// A lazy, forward-only cursor over the rows produced by a query.
///
/// `next` is the only operation that may perform I/O (fetching the next
/// batch of rows from the backend); every other method reads the row
/// currently under the cursor. NULL reads return the type's zero value;
/// [`ResultSet::is_null`] is the authoritative check.
pub trait ResultSet: Send + Sync {
    /// Advances to the next row. Returns `false` once past the last row.
    /// Calling `next` again past the end keeps returning `false`.
    #[allow(async_fn_in_trait)]
    async fn next(&mut self) -> Result<bool, DbError>;

    /// `true` before the first call to `next`.
    fn is_before_first(&self) -> bool;

    /// `true` once `next` has returned `false`.
    fn is_after_last(&self) -> bool;

    /// The 1-based row number of the current row, valid after a
    /// successful `next`.
    fn row_number(&self) -> u64;

    /// The value at the given 1-based column index.
    fn get(&self, index: usize) -> Result<Value, DbError>;

    /// The value in the column with the given name.
    fn get_named(&self, name: &str) -> Result<Value, DbError>;

    /// `true` if the value at the given 1-based column index is NULL.
    fn is_null(&self, index: usize) -> Result<bool, DbError>;

    /// Column names, in declaration order.
    fn column_names(&self) -> &[String];

    /// The number of columns.
    fn column_count(&self) -> usize;

    /// Releases any resources held by this result set. Idempotent.
    #[allow(async_fn_in_trait)]
    async fn close(&mut self) -> Result<(), DbError>;

    /// The 1-based index of `name`, looked up against [`ResultSet::column_names`].
    fn column_index(&self, name: &str) -> Result<usize, DbError> {
        self.column_names()
            .iter()
            .position(|c| c == name)
            .map(|pos| pos + 1)
            .ok_or_else(|| DbError::InvalidParameter(format!("unknown column `{name}`")))
    }

    /// Reads the column at `index` as an integer. NULL yields `0`.
    fn get_integer(&self, index: usize) -> Result<i32, DbError> {
        Ok(self.get(index)?.as_i32())
    }

    /// See [`ResultSet::get_integer`], by column name.
    fn get_integer_named(&self, name: &str) -> Result<i32, DbError> {
        Ok(self.get_named(name)?.as_i32())
    }

    /// Reads the column at `index` as a long. NULL yields `0`.
    fn get_long(&self, index: usize) -> Result<i64, DbError> {
        Ok(self.get(index)?.as_i64())
    }

    /// See [`ResultSet::get_long`], by column name.
    fn get_long_named(&self, name: &str) -> Result<i64, DbError> {
        Ok(self.get_named(name)?.as_i64())
    }

    /// Reads the column at `index` as a double. NULL yields `0.0`.
    fn get_double(&self, index: usize) -> Result<f64, DbError> {
        Ok(self.get(index)?.as_f64())
    }

    /// See [`ResultSet::get_double`], by column name.
    fn get_double_named(&self, name: &str) -> Result<f64, DbError> {
        Ok(self.get_named(name)?.as_f64())
    }

    /// Reads the column at `index` as a boolean. NULL yields `false`.
    fn get_boolean(&self, index: usize) -> Result<bool, DbError> {
        Ok(self.get(index)?.as_bool())
    }

    /// See [`ResultSet::get_boolean`], by column name.
    fn get_boolean_named(&self, name: &str) -> Result<bool, DbError> {
        Ok(self.get_named(name)?.as_bool())
    }

    /// Reads the column at `index` as a string. NULL yields `""`.
    fn get_string(&self, index: usize) -> Result<String, DbError> {
        Ok(self.get(index)?.as_str().to_owned())
    }

    /// See [`ResultSet::get_string`], by column name.
    fn get_string_named(&self, name: &str) -> Result<String, DbError> {
        Ok(self.get_named(name)?.as_str().to_owned())
    }

    /// Reads the column at `index` as bytes. NULL yields an empty vector.
    fn get_bytes(&self, index: usize) -> Result<Vec<u8>, DbError> {
        Ok(self.get(index)?.as_bytes().to_vec())
    }

    /// See [`ResultSet::get_bytes`], by column name.
    fn get_bytes_named(&self, name: &str) -> Result<Vec<u8>, DbError> {
        Ok(self.get_named(name)?.as_bytes().to_vec())
    }

    /// Reads the column at `index` as a date.
    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>, DbError> {
        match self.get(index)? {
            Value::Date(d) => Ok(Some(d)),
            Value::Null => Ok(None),
            other => type_mismatch(index, "DATE", other.type_name()),
        }
    }

    /// Reads the column at `index` as a time-of-day.
    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>, DbError> {
        match self.get(index)? {
            Value::Time(t) => Ok(Some(t)),
            Value::Null => Ok(None),
            other => type_mismatch(index, "TIME", other.type_name()),
        }
    }

    /// Reads the column at `index` as a timestamp.
    fn get_timestamp(&self, index: usize) -> Result<Option<Timestamp>, DbError> {
        match self.get(index)? {
            Value::Timestamp(ts) => Ok(Some(ts)),
            Value::Null => Ok(None),
            other => type_mismatch(index, "TIMESTAMP", other.type_name()),
        }
    }

    /// Reads the column at `index` as a UUID. Columnar drivers only.
    fn get_uuid(&self, index: usize) -> Result<Option<Uuid>, DbError> {
        match self.get(index)? {
            Value::Uuid(u) => Ok(Some(u)),
            Value::Null => Ok(None),
            other => type_mismatch(index, "UUID", other.type_name()),
        }
    }
}

fn type_mismatch<T>(index: usize, expected: &str, found: &str) -> Result<T, DbError> {
    Err(DbError::InvalidParameter(format!(
        "column {index}: expected {expected}, found {found}"
    )))
}

/// Object-safe mirror of [`ResultSet`] for storage behind `Box<dyn
/// DynResultSet>`. Every [`ResultSet`] implementer gets this for free.
#[async_trait]
pub trait DynResultSet: Send + Sync {
    /// See [`ResultSet::next`].
    async fn next(&mut self) -> Result<bool, DbError>;
    /// See [`ResultSet::is_before_first`].
    fn is_before_first(&self) -> bool;
    /// See [`ResultSet::is_after_last`].
    fn is_after_last(&self) -> bool;
    /// See [`ResultSet::row_number`].
    fn row_number(&self) -> u64;
    /// See [`ResultSet::get`].
    fn get(&self, index: usize) -> Result<Value, DbError>;
    /// See [`ResultSet::get_named`].
    fn get_named(&self, name: &str) -> Result<Value, DbError>;
    /// See [`ResultSet::is_null`].
    fn is_null(&self, index: usize) -> Result<bool, DbError>;
    /// See [`ResultSet::column_names`].
    fn column_names(&self) -> &[String];
    /// See [`ResultSet::column_count`].
    fn column_count(&self) -> usize;
    /// See [`ResultSet::close`].
    async fn close(&mut self) -> Result<(), DbError>;
}

#[async_trait]
impl<T> DynResultSet for T
where
    T: ResultSet + 'static,
{
    async fn next(&mut self) -> Result<bool, DbError> {
        ResultSet::next(self).await
    }

    fn is_before_first(&self) -> bool {
        ResultSet::is_before_first(self)
    }

    fn is_after_last(&self) -> bool {
        ResultSet::is_after_last(self)
    }

    fn row_number(&self) -> u64 {
        ResultSet::row_number(self)
    }

    fn get(&self, index: usize) -> Result<Value, DbError> {
        ResultSet::get(self, index)
    }

    fn get_named(&self, name: &str) -> Result<Value, DbError> {
        ResultSet::get_named(self, name)
    }

    fn is_null(&self, index: usize) -> Result<bool, DbError> {
        ResultSet::is_null(self, index)
    }

    fn column_names(&self) -> &[String] {
        ResultSet::column_names(self)
    }

    fn column_count(&self) -> usize {
        ResultSet::column_count(self)
    }

    async fn close(&mut self) -> Result<(), DbError> {
        ResultSet::close(self).await
    }
}
