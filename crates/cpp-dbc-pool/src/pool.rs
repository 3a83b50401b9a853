//! The connection pool: construction, borrow, return, maintenance and
//! shutdown.
//!
//! `PoolInner` owns the two bookkeeping collections (`all_connections`,
//! `idle_connections`) plus the atomics described in the concurrency model:
//! `running`, `pool_alive` (shared with every issued handle),
//! `active_count`. Locks on the two collections are always taken in the
//! fixed order `all_connections` before `idle_connections` when both are
//! needed together, matching the maintenance loop, to avoid a deadlock
//! between a borrower/returner and the maintenance task.
//!
//! `ConnectionPool` is a cheap `Clone`-able handle (`Arc<PoolInner>`); the
//! maintenance task holds its own clone, so the pool only actually drops
//! once every handle, including the maintenance task's, has gone away —
//! which happens once [`ConnectionPool::close`] has joined it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use cpp_dbc_driver::{ConnectionOptions, DynDriver};
use cpp_dbc_error::DbError;
use cpp_dbc_registry::DriverRegistry;
use cpp_dbc_types::DriverFamily;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::PoolConfig;
use crate::pooled::PooledConnection;
use crate::slot::Slot;

/// How often a blocked borrow rechecks the idle queue and a draining
/// shutdown rechecks `active_count`.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The cap shutdown waits against before forcing `active_count` to zero.
const SHUTDOWN_DRAIN_CAP: Duration = Duration::from_secs(10);

pub(crate) struct PoolInner {
    config: PoolConfig,
    driver: Arc<dyn DynDriver>,
    options: ConnectionOptions,
    all_connections: Mutex<HashMap<u64, Arc<Slot>>>,
    idle_connections: Mutex<VecDeque<Arc<Slot>>>,
    next_id: AtomicU64,
    running: AtomicBool,
    pool_alive: Arc<AtomicBool>,
    active_count: AtomicU32,
    maintenance_notify: Notify,
    maintenance_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PoolInner {
    async fn create_slot(&self) -> Result<Arc<Slot>, DbError> {
        let conn = self
            .driver
            .connect(
                &self.config.url,
                &self.config.username,
                &self.config.password,
                &self.options,
            )
            .await?;
        self.apply_isolation(conn.as_ref()).await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(Slot::new(id, conn)))
    }

    async fn apply_isolation(&self, conn: &dyn cpp_dbc_driver::DynConnection) -> Result<(), DbError> {
        let level = self.config.transaction_isolation;
        if !self.driver.accepted_isolation_levels().contains(&level) {
            return Err(DbError::UnsupportedIsolation(level));
        }
        conn.set_transaction_isolation(level).await
    }

    async fn validate(&self, conn: &dyn cpp_dbc_driver::DynConnection) -> bool {
        match conn.execute_query(&self.config.validation_query).await {
            Ok(mut rs) => {
                let _ = rs.close().await;
                true
            }
            Err(err) => {
                debug!(%err, "validation query failed");
                false
            }
        }
    }

    /// Steps 2-3 of borrow (spec §4.3.2): take an idle entry (validating and
    /// replacing it if needed), or create a fresh one if still under
    /// `max_size`. Returns `Ok(None)` when neither is currently possible —
    /// the caller falls through to the poll loop.
    async fn try_acquire(&self) -> Result<Option<Arc<Slot>>, DbError> {
        let popped = self.idle_connections.lock().pop_front();
        if let Some(slot) = popped {
            if !self.config.test_on_borrow || self.validate(slot.conn.as_ref()).await {
                return Ok(Some(slot));
            }
            warn!(id = slot.id, "borrow-time validation failed, replacing connection");
            self.all_connections.lock().remove(&slot.id);
            let _ = slot.conn.close().await;
            if !self.running.load(Ordering::Acquire) {
                return Ok(None);
            }
            return match self.create_slot().await {
                Ok(replacement) => {
                    self.all_connections
                        .lock()
                        .insert(replacement.id, replacement.clone());
                    Ok(Some(replacement))
                }
                Err(err) => {
                    warn!(%err, "replacement connection failed during borrow");
                    Ok(None)
                }
            };
        }

        let under_cap = (self.all_connections.lock().len() as u32) < self.config.max_size;
        if !under_cap {
            return Ok(None);
        }
        let candidate = match self.create_slot().await {
            Ok(slot) => slot,
            Err(err) => {
                debug!(%err, "speculative connection creation failed, falling back to wait");
                return Ok(None);
            }
        };
        let mut all = self.all_connections.lock();
        if (all.len() as u32) < self.config.max_size {
            all.insert(candidate.id, candidate.clone());
            drop(all);
            Ok(Some(candidate))
        } else {
            drop(all);
            let _ = candidate.conn.close().await;
            Ok(None)
        }
    }

    /// Return algorithm, spec §4.3.3. Never fails outward: every failure
    /// path is absorbed by closing or replacing the slot.
    pub(crate) async fn return_connection(&self, slot: Arc<Slot>) {
        if !self.running.load(Ordering::Acquire) {
            let _ = slot.conn.close().await;
            return;
        }
        if !slot.is_active() {
            trace!(id = slot.id, "ignoring duplicate return");
            return;
        }
        if !self.all_connections.lock().contains_key(&slot.id) {
            trace!(id = slot.id, "ignoring return of evicted slot");
            return;
        }

        if self.config.test_on_return && !self.validate(slot.conn.as_ref()).await {
            self.active_count.fetch_sub(1, Ordering::AcqRel);
            self.all_connections.lock().remove(&slot.id);
            let _ = slot.conn.close().await;
            match self.create_slot().await {
                Ok(replacement) => {
                    self.all_connections
                        .lock()
                        .insert(replacement.id, replacement.clone());
                    self.idle_connections.lock().push_back(replacement);
                }
                Err(err) => warn!(%err, "replacement on return failed, evicting without replacement"),
            }
        } else {
            if let Ok(current) = slot.conn.transaction_isolation() {
                if current != self.config.transaction_isolation {
                    let _ = slot
                        .conn
                        .set_transaction_isolation(self.config.transaction_isolation)
                        .await;
                }
            }
            slot.mark_idle();
            self.active_count.fetch_sub(1, Ordering::AcqRel);
            self.idle_connections.lock().push_back(slot);
        }
        self.maintenance_notify.notify_one();
    }

    async fn maintenance_tick(&self) {
        let mut evicted = Vec::new();
        {
            let mut all = self.all_connections.lock();
            let mut idle = self.idle_connections.lock();
            let min_idle = self.config.min_idle as usize;
            let mut kept = VecDeque::with_capacity(idle.len());
            while let Some(slot) = idle.pop_front() {
                let stale = slot.idle_for() > self.config.idle_timeout
                    || slot.age() > self.config.max_lifetime;
                if stale && all.len() > min_idle {
                    all.remove(&slot.id);
                    evicted.push(slot);
                } else {
                    kept.push_back(slot);
                }
            }
            *idle = kept;
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "maintenance evicting stale connections");
        }
        for slot in evicted {
            let _ = slot.conn.close().await;
        }

        while self.running.load(Ordering::Acquire)
            && (self.all_connections.lock().len() as u32) < self.config.min_idle
        {
            match self.create_slot().await {
                Ok(slot) => {
                    let mut all = self.all_connections.lock();
                    if (all.len() as u32) < self.config.min_idle {
                        all.insert(slot.id, slot.clone());
                        drop(all);
                        self.idle_connections.lock().push_back(slot);
                    } else {
                        drop(all);
                        let _ = slot.conn.close().await;
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "maintenance backfill failed");
                    break;
                }
            }
        }
    }

    async fn run_maintenance(self: Arc<Self>) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.config.validation_interval) => {},
                () = self.maintenance_notify.notified() => {},
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.maintenance_tick().await;
        }
    }
}

/// A cheap-to-clone handle to a running connection pool.
///
/// See the module docs for the locking and liveness model; see spec §4.3 for
/// the full borrow/return/maintenance/shutdown algorithms this implements.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

/// A point-in-time snapshot of pool occupancy, spec §4.3.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Checked-out connection count.
    pub active: u32,
    /// Connections sitting in the idle queue.
    pub idle: u32,
    /// `active + idle`.
    pub total: u32,
    /// `false` once [`ConnectionPool::close`] has run.
    pub running: bool,
}

impl ConnectionPool {
    /// Builds and starts a pool per `config` (spec §4.3.1): resolves the
    /// driver, opens `initial_size` connections, and starts the maintenance
    /// task. On any failure to build an initial connection, every connection
    /// opened so far is closed and the error propagates — the pool is never
    /// left half-constructed.
    pub async fn create(config: PoolConfig) -> Result<Self, DbError> {
        config
            .validate()
            .map_err(|err| DbError::InvalidParameter(err.to_string()))?;

        let driver = DriverRegistry::resolve(&config.url)?;
        if driver.family() != DriverFamily::Relational {
            return Err(DbError::WrongDriverFamily {
                expected: DriverFamily::Relational,
                found: driver.family(),
            });
        }

        let options = config
            .options
            .iter()
            .fold(ConnectionOptions::new(), |opts, (k, v)| {
                opts.with_option(k.clone(), v.clone())
            });

        let inner = Arc::new(PoolInner {
            config: config.clone(),
            driver,
            options,
            all_connections: Mutex::new(HashMap::new()),
            idle_connections: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            running: AtomicBool::new(true),
            pool_alive: Arc::new(AtomicBool::new(true)),
            active_count: AtomicU32::new(0),
            maintenance_notify: Notify::new(),
            maintenance_handle: Mutex::new(None),
        });

        let mut created = Vec::with_capacity(config.initial_size as usize);
        for _ in 0..config.initial_size {
            match inner.create_slot().await {
                Ok(slot) => created.push(slot),
                Err(err) => {
                    for slot in created {
                        let _ = slot.conn.close().await;
                    }
                    return Err(err);
                }
            }
        }
        {
            let mut all = inner.all_connections.lock();
            let mut idle = inner.idle_connections.lock();
            for slot in created {
                all.insert(slot.id, slot.clone());
                idle.push_back(slot);
            }
        }

        let maintenance_inner = inner.clone();
        let handle = tokio::spawn(async move { maintenance_inner.run_maintenance().await });
        *inner.maintenance_handle.lock() = Some(handle);

        info!(name = %inner.config.name, initial_size = config.initial_size, "connection pool constructed");
        Ok(Self { inner })
    }

    /// Checks out an idle connection, creating one if under capacity or
    /// waiting (polling every 10 ms) up to `connection_timeout` otherwise.
    /// Fails with `PoolClosed` if the pool is not running, or `BorrowTimeout`
    /// if the wait expires.
    pub async fn get_connection(&self) -> Result<PooledConnection, DbError> {
        if !self.inner.running.load(Ordering::Acquire) {
            return Err(DbError::PoolClosed);
        }
        if let Some(slot) = self.inner.try_acquire().await? {
            return Ok(self.admit(slot));
        }

        let deadline = Instant::now() + self.inner.config.connection_timeout;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if !self.inner.running.load(Ordering::Acquire) {
                return Err(DbError::PoolClosed);
            }
            if Instant::now() >= deadline {
                return Err(DbError::BorrowTimeout(self.inner.config.connection_timeout));
            }
            if let Some(slot) = self.inner.try_acquire().await? {
                return Ok(self.admit(slot));
            }
        }
    }

    fn admit(&self, slot: Arc<Slot>) -> PooledConnection {
        slot.mark_active();
        self.inner.active_count.fetch_add(1, Ordering::AcqRel);
        PooledConnection::new(
            slot,
            Arc::downgrade(&self.inner),
            self.inner.pool_alive.clone(),
        )
    }

    /// Shuts the pool down (spec §4.3.5). Idempotent. Waits up to 10 s for
    /// outstanding handles to drain before forcing the count to zero and
    /// proceeding; an outstanding handle dropped after this point closes its
    /// physical connection directly rather than returning it (`pool_alive`
    /// is already false).
    pub async fn close(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.inner.pool_alive.store(false, Ordering::Release);
        self.inner.maintenance_notify.notify_one();

        let deadline = Instant::now() + SHUTDOWN_DRAIN_CAP;
        while self.inner.active_count.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                warn!("shutdown drain cap reached, forcing active_count to zero");
                self.inner.active_count.store(0, Ordering::Release);
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        if let Some(handle) = self.inner.maintenance_handle.lock().take() {
            let _ = handle.await;
        }

        let slots: Vec<Arc<Slot>> = {
            let mut all = self.inner.all_connections.lock();
            let mut idle = self.inner.idle_connections.lock();
            idle.clear();
            let slots = all.values().cloned().collect::<Vec<_>>();
            all.clear();
            slots
        };
        for slot in slots {
            slot.mark_idle();
            let _ = slot.conn.close().await;
        }

        info!(name = %self.inner.config.name, "connection pool closed");
    }

    /// Checked-out connection count.
    #[must_use]
    pub fn active_count(&self) -> u32 {
        self.inner.active_count.load(Ordering::Acquire)
    }

    /// Connections sitting in the idle queue.
    #[must_use]
    pub fn idle_count(&self) -> u32 {
        self.inner.idle_connections.lock().len() as u32
    }

    /// `active_count() + idle_count()`.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.inner.all_connections.lock().len() as u32
    }

    /// `false` once [`ConnectionPool::close`] has run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// A consistent-enough-for-observability snapshot of the four stats
    /// above, read without a single joint lock (as spec §4.3.7 only asks for
    /// read-only statistics, not a transactional snapshot).
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            active: self.active_count(),
            idle: self.idle_count(),
            total: self.total_count(),
            running: self.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpp_dbc_driver::Connection;
    use cpp_dbc_testkit::MemoryDriver;
    use cpp_dbc_types::IsolationLevel;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicU32 as StdAtomicU32;
    use std::sync::Once;

    static REGISTER: Once = Once::new();

    fn ensure_driver_registered() {
        REGISTER.call_once(|| {
            DriverRegistry::register(Arc::new(MemoryDriver));
        });
    }

    fn unique_url(tag: &str) -> String {
        static COUNTER: StdAtomicU32 = StdAtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        format!("cpp_dbc:memory://pool-test-{tag}-{n}")
    }

    async fn test_pool(config: PoolConfig) -> ConnectionPool {
        ensure_driver_registered();
        ConnectionPool::create(config).await.unwrap()
    }

    #[tokio::test]
    async fn construction_opens_initial_size_and_reports_accounting() {
        let config = PoolConfig::new()
            .url(unique_url("ctor"))
            .initial_size(3)
            .min_idle(1)
            .max_size(5);
        let pool = test_pool(config).await;
        assert_eq!(pool.total_count(), 3);
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.active_count(), 0);
        pool.close().await;
    }

    #[tokio::test]
    async fn borrow_and_return_round_trips_accounting() {
        let config = PoolConfig::new()
            .url(unique_url("borrow"))
            .initial_size(1)
            .min_idle(1)
            .max_size(2);
        let pool = test_pool(config).await;

        let conn = pool.get_connection().await.unwrap();
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.idle_count(), 0);
        conn.close().await.unwrap();

        // Return happens inline for an explicit close.
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.idle_count(), 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn borrow_creates_beyond_initial_up_to_max_size() {
        let config = PoolConfig::new()
            .url(unique_url("grow"))
            .initial_size(1)
            .min_idle(0)
            .max_size(2);
        let pool = test_pool(config).await;

        let a = pool.get_connection().await.unwrap();
        let b = pool.get_connection().await.unwrap();
        assert_eq!(pool.total_count(), 2);
        assert_eq!(pool.active_count(), 2);
        drop(a);
        drop(b);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn borrow_times_out_when_exhausted() {
        let config = PoolConfig::new()
            .url(unique_url("timeout"))
            .initial_size(1)
            .min_idle(1)
            .max_size(1)
            .connection_timeout(Duration::from_millis(200));
        let pool = test_pool(config).await;

        let held = pool.get_connection().await.unwrap();
        let err = pool.get_connection().await.unwrap_err();
        assert!(matches!(err, DbError::BorrowTimeout(_)));
        drop(held);
        pool.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let pool = test_pool(PoolConfig::new().url(unique_url("idempotent-close")).initial_size(1)).await;
        pool.close().await;
        pool.close().await;
        assert!(!pool.is_running());
    }

    #[tokio::test]
    async fn borrow_after_close_fails_pool_closed() {
        let pool = test_pool(PoolConfig::new().url(unique_url("closed-borrow")).initial_size(1)).await;
        pool.close().await;
        let err = pool.get_connection().await.unwrap_err();
        assert!(matches!(err, DbError::PoolClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_outstanding_handle_then_closes() {
        let pool = test_pool(PoolConfig::new().url(unique_url("drop-after-close")).initial_size(1)).await;
        let conn = pool.get_connection().await.unwrap();

        let closer = {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.close().await;
            })
        };
        tokio::task::yield_now().await;
        drop(conn);
        closer.await.unwrap();

        assert!(!pool.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn maintenance_evicts_down_to_min_idle() {
        let config = PoolConfig::new()
            .url(unique_url("evict"))
            .initial_size(3)
            .min_idle(1)
            .max_size(5)
            .idle_timeout(Duration::from_millis(50))
            .validation_interval(Duration::from_millis(10));
        let pool = test_pool(config).await;

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;

        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.total_count(), 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn borrow_without_concurrent_returns_follows_enqueue_order() {
        let config = PoolConfig::new()
            .url(unique_url("fifo"))
            .initial_size(3)
            .min_idle(0)
            .max_size(3);
        let pool = test_pool(config).await;

        let a = pool.get_connection().await.unwrap();
        let b = pool.get_connection().await.unwrap();
        let c = pool.get_connection().await.unwrap();
        let (id_a, id_b, id_c) = (a.slot_id(), b.slot_id(), c.slot_id());

        // Return order: b, c, a. With no borrows racing the returns, the
        // idle queue is a plain FIFO, so borrows should come back in that
        // same order.
        b.close().await.unwrap();
        c.close().await.unwrap();
        a.close().await.unwrap();

        let first = pool.get_connection().await.unwrap();
        let second = pool.get_connection().await.unwrap();
        let third = pool.get_connection().await.unwrap();

        assert_eq!(first.slot_id(), id_b);
        assert_eq!(second.slot_id(), id_c);
        assert_eq!(third.slot_id(), id_a);

        drop(first);
        drop(second);
        drop(third);
        pool.close().await;
    }

    #[tokio::test]
    async fn isolation_is_reset_to_pool_default_on_return() {
        let config = PoolConfig::new()
            .url(unique_url("isolation-reset"))
            .initial_size(1)
            .min_idle(1)
            .max_size(1)
            .test_on_return(true)
            .transaction_isolation(IsolationLevel::ReadCommitted);
        let pool = test_pool(config).await;

        let conn = pool.get_connection().await.unwrap();
        conn.set_transaction_isolation(IsolationLevel::Serializable)
            .await
            .unwrap();
        conn.close().await.unwrap();

        let next = pool.get_connection().await.unwrap();
        assert_eq!(
            next.transaction_isolation().unwrap(),
            IsolationLevel::ReadCommitted
        );
        drop(next);
        pool.close().await;
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 24, ..ProptestConfig::default() })]

        /// P1: across any interleaving of borrows and returns, `total ==
        /// active + idle` and `total` never exceeds `max_size`.
        #[test]
        fn accounting_holds_across_random_borrow_return_sequences(
            wants_borrow in proptest::collection::vec(any::<bool>(), 1..24)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let snapshots = rt.block_on(async {
                ensure_driver_registered();
                let config = PoolConfig::new()
                    .url(unique_url("prop-accounting"))
                    .initial_size(2)
                    .min_idle(2)
                    .max_size(4)
                    .connection_timeout(Duration::from_millis(5));
                let pool = ConnectionPool::create(config).await.unwrap();

                let mut held = Vec::new();
                let mut snapshots = Vec::with_capacity(wants_borrow.len());
                for want_borrow in wants_borrow {
                    if want_borrow || held.is_empty() {
                        if let Ok(conn) = pool.get_connection().await {
                            held.push(conn);
                        }
                    } else if let Some(conn) = held.pop() {
                        // Explicit close rather than drop: the return happens
                        // inline, so the snapshot below observes it rather
                        // than racing the Drop impl's spawned task.
                        let _ = conn.close().await;
                    }
                    snapshots.push((pool.active_count(), pool.idle_count(), pool.total_count()));
                }
                for conn in held {
                    let _ = conn.close().await;
                }
                pool.close().await;
                snapshots
            });

            for (active, idle, total) in snapshots {
                prop_assert_eq!(total, active + idle);
                prop_assert!(total <= 4);
            }
        }
    }

    #[tokio::test]
    async fn wrong_driver_family_is_rejected() {
        ensure_driver_registered();
        DriverRegistry::register(Arc::new(cpp_dbc_testkit::MemoryColumnarDriver));

        let err = ConnectionPool::create(
            PoolConfig::new()
                .url(unique_url("memcolumnar").replacen("memory", "memcolumnar", 1))
                .initial_size(0)
                .min_idle(0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::WrongDriverFamily { .. }));
    }
}
