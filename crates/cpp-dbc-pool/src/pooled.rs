//! The pool-issued connection handle.
//!
//! A `PooledConnection` is a thin wrapper: every data operation forwards to
//! the wrapped [`Slot`]'s physical connection after a closed check and a
//! timestamp refresh. The part worth reading carefully is the return-to-pool
//! protocol in [`PooledConnection::release`], shared by both the explicit
//! `close()` path and `Drop` — it is what keeps a handle from resurrecting a
//! pool that has already been shut down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpp_dbc_driver::{Connection, DynPreparedStatement, DynResultSet};
use cpp_dbc_error::DbError;
use cpp_dbc_types::IsolationLevel;
use tracing::error;

use crate::pool::PoolInner;
use crate::slot::Slot;

/// A checked-out connection borrowed from a [`ConnectionPool`](crate::ConnectionPool).
///
/// Dropping a `PooledConnection` returns it to the pool it came from; calling
/// [`Connection::close`] on it does the same thing explicitly and
/// idempotently (a handle closed twice, or closed then dropped, returns at
/// most once).
pub struct PooledConnection {
    slot: Arc<Slot>,
    pool: std::sync::Weak<PoolInner>,
    pool_alive: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl PooledConnection {
    pub(crate) fn new(
        slot: Arc<Slot>,
        pool: std::sync::Weak<PoolInner>,
        pool_alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            slot,
            pool,
            pool_alive,
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            Err(DbError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    /// Steps 1-5 of the return-to-pool protocol: flip `closed` (idempotent),
    /// then either hand the slot back to a still-alive pool or close the
    /// physical connection directly.
    async fn release(slot: Arc<Slot>, pool: std::sync::Weak<PoolInner>, pool_alive: Arc<AtomicBool>) {
        if !pool_alive.load(Ordering::Acquire) {
            let _ = slot.conn.close().await;
            return;
        }
        match pool.upgrade() {
            Some(pool) => pool.return_connection(slot).await,
            None => {
                let _ = slot.conn.close().await;
            }
        }
    }

    /// `true` the first time this is called on a given handle; `false` on
    /// every call after (the handle was already closed or dropped).
    fn take_close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The pool's internal identity for the slot this handle wraps. Exposed
    /// only so this crate's own tests can assert borrow ordering.
    #[cfg(test)]
    pub(crate) fn slot_id(&self) -> u64 {
        self.slot.id
    }
}

impl Connection for PooledConnection {
    async fn execute_update(&self, sql: &str) -> Result<u64, DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.execute_update(sql).await
    }

    async fn execute_query(&self, sql: &str) -> Result<Box<dyn DynResultSet>, DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.execute_query(sql).await
    }

    async fn prepare_statement(&self, sql: &str) -> Result<Box<dyn DynPreparedStatement>, DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.prepare_statement(sql).await
    }

    fn set_auto_commit(&self, flag: bool) -> Result<(), DbError> {
        self.check_open()?;
        self.slot.conn.set_auto_commit(flag)
    }

    fn auto_commit(&self) -> Result<bool, DbError> {
        self.check_open()?;
        self.slot.conn.auto_commit()
    }

    async fn begin_transaction(&self) -> Result<bool, DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.begin_transaction().await
    }

    async fn commit(&self) -> Result<(), DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.commit().await
    }

    async fn rollback(&self) -> Result<(), DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.rollback().await
    }

    fn transaction_active(&self) -> Result<bool, DbError> {
        self.check_open()?;
        self.slot.conn.transaction_active()
    }

    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DbError> {
        self.check_open()?;
        self.slot.touch();
        self.slot.conn.set_transaction_isolation(level).await
    }

    fn transaction_isolation(&self) -> Result<IsolationLevel, DbError> {
        self.check_open()?;
        self.slot.conn.transaction_isolation()
    }

    /// Returns the handle to its pool rather than closing the physical
    /// connection (unless the pool is gone, in which case it does close it).
    /// Idempotent: a second call is a no-op.
    async fn close(&self) -> Result<(), DbError> {
        if self.take_close() {
            Self::release(self.slot.clone(), self.pool.clone(), self.pool_alive.clone()).await;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn url(&self) -> &str {
        self.slot.conn.url()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if !self.take_close() {
            return;
        }
        let slot = self.slot.clone();
        let pool = self.pool.clone();
        let pool_alive = self.pool_alive.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    Self::release(slot, pool, pool_alive).await;
                });
            }
            Err(_) => {
                error!(
                    "PooledConnection dropped outside a tokio runtime context; \
                     the physical connection cannot be returned and is leaked"
                );
            }
        }
    }
}
