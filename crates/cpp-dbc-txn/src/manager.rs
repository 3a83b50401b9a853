//! The transaction manager itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cpp_dbc_driver::Connection;
use cpp_dbc_error::DbError;
use cpp_dbc_pool::{ConnectionPool, PooledConnection};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often the background sweep checks for timed-out transactions.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// The default age (spec §4.6 `set_transaction_timeout`) after which an
/// open transaction is considered abandoned and rolled back by the sweep.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(60);

struct TxnRecord {
    conn: Arc<PooledConnection>,
    opened_at: Instant,
}

struct Inner {
    pool: ConnectionPool,
    records: Mutex<HashMap<String, TxnRecord>>,
    timeout: SyncMutex<Duration>,
    running: AtomicBool,
    sweep_handle: SyncMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Inner {
    async fn sweep_once(&self) {
        let timeout = *self.timeout.lock();
        let expired: Vec<(String, Arc<PooledConnection>)> = {
            let mut records = self.records.lock().await;
            let mut expired = Vec::new();
            records.retain(|id, record| {
                if record.opened_at.elapsed() > timeout {
                    expired.push((id.clone(), record.conn.clone()));
                    false
                } else {
                    true
                }
            });
            expired
        };
        for (id, conn) in expired {
            warn!(txn_id = %id, "transaction exceeded timeout, rolling back");
            if let Err(err) = conn.rollback().await {
                warn!(txn_id = %id, %err, "timeout rollback failed");
            }
        }
    }

    async fn run_sweep(self: Arc<Self>) {
        loop {
            tokio::time::sleep(DEFAULT_SWEEP_INTERVAL).await;
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.sweep_once().await;
        }
    }
}

/// Pins a borrowed [`PooledConnection`] to an opaque transaction id so
/// cooperating callers on different threads can run successive statements
/// against the same physical session.
///
/// See spec §4.6: the manager itself does not make the physical connection
/// thread-safe for concurrent use — the caller is responsible for not
/// issuing overlapping operations on the same transaction id.
#[derive(Clone)]
pub struct TransactionManager {
    inner: Arc<Inner>,
}

impl TransactionManager {
    /// Builds a manager over `pool`, with transactions rolled back by the
    /// background sweep after `timeout` of inactivity since they were
    /// opened.
    #[must_use]
    pub fn new(pool: ConnectionPool, timeout: Duration) -> Self {
        let inner = Arc::new(Inner {
            pool,
            records: Mutex::new(HashMap::new()),
            timeout: SyncMutex::new(timeout),
            running: AtomicBool::new(true),
            sweep_handle: SyncMutex::new(None),
        });
        let sweep_inner = inner.clone();
        let handle = tokio::spawn(async move { sweep_inner.run_sweep().await });
        *inner.sweep_handle.lock() = Some(handle);
        Self { inner }
    }

    /// Builds a manager with [`DEFAULT_TRANSACTION_TIMEOUT`].
    #[must_use]
    pub fn with_default_timeout(pool: ConnectionPool) -> Self {
        Self::new(pool, DEFAULT_TRANSACTION_TIMEOUT)
    }

    /// Borrows a connection from the pool, starts a transaction on it, and
    /// returns a fresh opaque id identifying it.
    pub async fn begin_transaction(&self) -> Result<String, DbError> {
        let conn = self.inner.pool.get_connection().await?;
        conn.begin_transaction().await?;
        let id = Uuid::new_v4().to_string();
        self.inner.records.lock().await.insert(
            id.clone(),
            TxnRecord {
                conn: Arc::new(conn),
                opened_at: Instant::now(),
            },
        );
        debug!(txn_id = %id, "transaction opened");
        Ok(id)
    }

    /// Returns the connection pinned to `id`. Every call while the
    /// transaction is open returns a handle to the same underlying physical
    /// session (spec §8 P7); fails `UnknownTransaction` once the id has
    /// committed, rolled back, or timed out.
    pub async fn get_transaction_connection(
        &self,
        id: &str,
    ) -> Result<Arc<PooledConnection>, DbError> {
        self.inner
            .records
            .lock()
            .await
            .get(id)
            .map(|record| record.conn.clone())
            .ok_or_else(|| DbError::UnknownTransaction(id.to_owned()))
    }

    /// Commits `id`'s transaction, restores autocommit, and returns the
    /// connection to the pool. If the commit itself fails, a best-effort
    /// rollback is attempted before the error is surfaced; the record is
    /// removed either way.
    pub async fn commit_transaction(&self, id: &str) -> Result<(), DbError> {
        let record = self.take_record(id).await?;
        let result = record.conn.commit().await;
        if let Err(ref err) = result {
            warn!(txn_id = %id, %err, "commit failed, attempting best-effort rollback");
            let _ = record.conn.rollback().await;
        }
        debug!(txn_id = %id, "transaction committed");
        result
    }

    /// Rolls back `id`'s transaction, restores autocommit, and returns the
    /// connection to the pool.
    pub async fn rollback_transaction(&self, id: &str) -> Result<(), DbError> {
        let record = self.take_record(id).await?;
        let result = record.conn.rollback().await;
        debug!(txn_id = %id, "transaction rolled back");
        result
    }

    async fn take_record(&self, id: &str) -> Result<TxnRecord, DbError> {
        self.inner
            .records
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| DbError::UnknownTransaction(id.to_owned()))
    }

    /// Sets the inactivity timeout the background sweep rolls transactions
    /// back after.
    pub fn set_transaction_timeout(&self, timeout: Duration) {
        *self.inner.timeout.lock() = timeout;
    }

    /// The number of transactions currently open.
    pub async fn active_transaction_count(&self) -> usize {
        self.inner.records.lock().await.len()
    }

    /// Rolls back every remaining open transaction and returns their
    /// connections to the pool, then stops the background sweep. Idempotent.
    pub async fn close(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let records: Vec<(String, TxnRecord)> = self.inner.records.lock().await.drain().collect();
        for (id, record) in records {
            if let Err(err) = record.conn.rollback().await {
                warn!(txn_id = %id, %err, "rollback during manager close failed");
            }
        }
        if let Some(handle) = self.inner.sweep_handle.lock().take() {
            handle.abort();
        }
        info!("transaction manager closed");
    }
}
