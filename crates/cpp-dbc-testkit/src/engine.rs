//! A tiny shared table store standing in for a real backend.
//!
//! Every [`MemoryConnection`](crate::connection::MemoryConnection) opened
//! against the same URL resolves to the same [`Backend`], the way separate
//! physical sessions against a real server all see the same committed
//! rows. There is no wire protocol here — this is in-process state, not a
//! simulated network peer.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cpp_dbc_types::Value;
use parking_lot::Mutex;

/// One table: a fixed column list plus its committed rows, in insertion
/// order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
}

impl Table {
    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

pub(crate) type Tables = HashMap<String, Table>;

/// The committed state shared by every connection opened against one URL.
#[derive(Default)]
pub(crate) struct Backend {
    pub(crate) tables: Mutex<Tables>,
}

fn backends() -> &'static Mutex<HashMap<String, Arc<Backend>>> {
    static BACKENDS: OnceLock<Mutex<HashMap<String, Arc<Backend>>>> = OnceLock::new();
    BACKENDS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the shared backend for `url`, creating an empty one the first
/// time it is requested.
pub(crate) fn backend_for(url: &str) -> Arc<Backend> {
    backends()
        .lock()
        .entry(url.to_owned())
        .or_insert_with(|| Arc::new(Backend::default()))
        .clone()
}

/// Drops the shared backend for `url`, discarding every table in it. Used
/// by tests that need a clean slate between cases sharing a URL.
pub fn reset_backend(url: &str) {
    backends().lock().remove(url);
}
