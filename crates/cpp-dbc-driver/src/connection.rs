//! The Physical Connection contract.

use async_trait::async_trait;
use cpp_dbc_error::DbError;
use cpp_dbc_types::IsolationLevel;

use crate::result_set::DynResultSet;
use crate::statement::DynPreparedStatement;

/// A live session against a backend, as created by `Driver::connect`.
///
/// All operations after [`Connection::close`] fail with
/// `DbError::ConnectionClosed`, including on any [`PreparedStatement`] or
/// [`ResultSet`](crate::ResultSet) that was obtained from this connection
/// before it closed — driver implementations must track and invalidate
/// those child objects.
///
/// [`PreparedStatement`]: crate::PreparedStatement
pub trait Connection: Send + Sync {
    /// Runs `sql` and returns the number of affected rows. DDL yields `0`.
    #[allow(async_fn_in_trait)]
    async fn execute_update(&self, sql: &str) -> Result<u64, DbError>;

    /// Runs `sql` and returns a [`ResultSet`](crate::ResultSet) over the
    /// produced rows.
    #[allow(async_fn_in_trait)]
    async fn execute_query(&self, sql: &str) -> Result<Box<dyn DynResultSet>, DbError>;

    /// Prepares `sql` for repeated execution with positional, 1-based
    /// placeholders.
    #[allow(async_fn_in_trait)]
    async fn prepare_statement(&self, sql: &str) -> Result<Box<dyn DynPreparedStatement>, DbError>;

    /// Sets the autocommit flag.
    fn set_auto_commit(&self, flag: bool) -> Result<(), DbError>;

    /// The current autocommit flag. Defaults to `true`.
    fn auto_commit(&self) -> Result<bool, DbError>;

    /// Starts a transaction, setting autocommit to `false` for its
    /// duration. Returns `true` if a transaction was started, `false` if
    /// one was already active.
    #[allow(async_fn_in_trait)]
    async fn begin_transaction(&self) -> Result<bool, DbError>;

    /// Commits the active transaction and restores autocommit to `true`.
    #[allow(async_fn_in_trait)]
    async fn commit(&self) -> Result<(), DbError>;

    /// Rolls back the active transaction and restores autocommit to
    /// `true`.
    #[allow(async_fn_in_trait)]
    async fn rollback(&self) -> Result<(), DbError>;

    /// `true` while a transaction is active on this connection.
    fn transaction_active(&self) -> Result<bool, DbError>;

    /// Sets the transaction isolation level. Backends that do not support
    /// `level` fail with `DbError::UnsupportedIsolation`.
    #[allow(async_fn_in_trait)]
    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DbError>;

    /// The current transaction isolation level.
    fn transaction_isolation(&self) -> Result<IsolationLevel, DbError>;

    /// Closes the connection. Idempotent: closing an already-closed
    /// connection is a no-op, not an error.
    #[allow(async_fn_in_trait)]
    async fn close(&self) -> Result<(), DbError>;

    /// `true` once [`Connection::close`] has run.
    fn is_closed(&self) -> bool;

    /// The URL this connection was opened against.
    fn url(&self) -> &str;
}

/// Object-safe mirror of [`Connection`] for storage behind `Box<dyn
/// DynConnection>`, used by the pool and the registry so heterogeneous
/// driver connection types can be stored side by side.
#[async_trait]
pub trait DynConnection: Send + Sync {
    /// See [`Connection::execute_update`].
    async fn execute_update(&self, sql: &str) -> Result<u64, DbError>;
    /// See [`Connection::execute_query`].
    async fn execute_query(&self, sql: &str) -> Result<Box<dyn DynResultSet>, DbError>;
    /// See [`Connection::prepare_statement`].
    async fn prepare_statement(&self, sql: &str)
    -> Result<Box<dyn DynPreparedStatement>, DbError>;
    /// See [`Connection::set_auto_commit`].
    fn set_auto_commit(&self, flag: bool) -> Result<(), DbError>;
    /// See [`Connection::auto_commit`].
    fn auto_commit(&self) -> Result<bool, DbError>;
    /// See [`Connection::begin_transaction`].
    async fn begin_transaction(&self) -> Result<bool, DbError>;
    /// See [`Connection::commit`].
    async fn commit(&self) -> Result<(), DbError>;
    /// See [`Connection::rollback`].
    async fn rollback(&self) -> Result<(), DbError>;
    /// See [`Connection::transaction_active`].
    fn transaction_active(&self) -> Result<bool, DbError>;
    /// See [`Connection::set_transaction_isolation`].
    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DbError>;
    /// See [`Connection::transaction_isolation`].
    fn transaction_isolation(&self) -> Result<IsolationLevel, DbError>;
    /// See [`Connection::close`].
    async fn close(&self) -> Result<(), DbError>;
    /// See [`Connection::is_closed`].
    fn is_closed(&self) -> bool;
    /// See [`Connection::url`].
    fn url(&self) -> &str;
}

#[async_trait]
impl<T> DynConnection for T
where
    T: Connection + 'static,
{
    async fn execute_update(&self, sql: &str) -> Result<u64, DbError> {
        Connection::execute_update(self, sql).await
    }

    async fn execute_query(&self, sql: &str) -> Result<Box<dyn DynResultSet>, DbError> {
        Connection::execute_query(self, sql).await
    }

    async fn prepare_statement(
        &self,
        sql: &str,
    ) -> Result<Box<dyn DynPreparedStatement>, DbError> {
        Connection::prepare_statement(self, sql).await
    }

    fn set_auto_commit(&self, flag: bool) -> Result<(), DbError> {
        Connection::set_auto_commit(self, flag)
    }

    fn auto_commit(&self) -> Result<bool, DbError> {
        Connection::auto_commit(self)
    }

    async fn begin_transaction(&self) -> Result<bool, DbError> {
        Connection::begin_transaction(self).await
    }

    async fn commit(&self) -> Result<(), DbError> {
        Connection::commit(self).await
    }

    async fn rollback(&self) -> Result<(), DbError> {
        Connection::rollback(self).await
    }

    fn transaction_active(&self) -> Result<bool, DbError> {
        Connection::transaction_active(self)
    }

    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DbError> {
        Connection::set_transaction_isolation(self, level).await
    }

    fn transaction_isolation(&self) -> Result<IsolationLevel, DbError> {
        Connection::transaction_isolation(self)
    }

    async fn close(&self) -> Result<(), DbError> {
        Connection::close(self).await
    }

    fn is_closed(&self) -> bool {
        Connection::is_closed(self)
    }

    fn url(&self) -> &str {
        Connection::url(self)
    }
}
