//! A pool-owned physical connection slot.
//!
//! A `Slot` is the pool's bookkeeping entry for one physical connection: it
//! is referenced (never duplicated) from `all_connections` and, while idle,
//! also from `idle_connections`. `active` is the single source of truth for
//! whether a slot is currently checked out; it is what keeps the two
//! collections from ever claiming the same slot is both idle and in use.

use std::sync::atomic::{AtomicBool, Ordering};

use cpp_dbc_driver::DynConnection;
use parking_lot::Mutex;
use tokio::time::Instant;

/// One pool-owned physical connection and its bookkeeping.
pub(crate) struct Slot {
    pub(crate) id: u64,
    pub(crate) conn: Box<dyn DynConnection>,
    pub(crate) created_at: Instant,
    last_used_at: Mutex<Instant>,
    active: AtomicBool,
}

impl Slot {
    pub(crate) fn new(id: u64, conn: Box<dyn DynConnection>) -> Self {
        let now = Instant::now();
        Self {
            id,
            conn,
            created_at: now,
            last_used_at: Mutex::new(now),
            active: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn mark_active(&self) {
        self.active.store(true, Ordering::Release);
        *self.last_used_at.lock() = Instant::now();
    }

    pub(crate) fn mark_idle(&self) {
        self.active.store(false, Ordering::Release);
        *self.last_used_at.lock() = Instant::now();
    }

    /// Refreshes the last-used timestamp without touching `active`. Called
    /// on every operation a borrowed [`PooledConnection`](crate::pooled::PooledConnection)
    /// performs, so a long-running borrow never looks idle-timed-out the
    /// moment it's returned.
    pub(crate) fn touch(&self) {
        *self.last_used_at.lock() = Instant::now();
    }

    pub(crate) fn last_used_at(&self) -> Instant {
        *self.last_used_at.lock()
    }

    pub(crate) fn idle_for(&self) -> std::time::Duration {
        self.last_used_at().elapsed()
    }

    pub(crate) fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}
