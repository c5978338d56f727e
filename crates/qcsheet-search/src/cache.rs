use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::table::ParsedTable;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableCacheStats {
    /// Lookups answered from memory.
    pub memory_hits: u64,
    /// Resolutions that found bytes in the persistent store.
    pub store_hits: u64,
    /// Network downloads (first resolution with an empty store, or a refresh).
    pub downloads: u64,
    /// Workbook parses.
    pub parses: u64,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Arc<ParsedTable>>,
    locks: HashMap<String, Arc<AsyncMutex<()>>>,
    stats: TableCacheStats,
}

/// In-memory map from source id to its parsed table, plus the per-source resolution locks.
///
/// Entries live for the lifetime of the cache and are only replaced by a refresh. Callers get
/// `Arc` handles, so a replacement never disturbs a search already running against the old
/// table.
#[derive(Default)]
pub struct TableCache {
    inner: Mutex<Inner>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<ParsedTable>> {
        self.inner
            .lock()
            .expect("table cache mutex poisoned")
            .tables
            .get(source_id)
            .cloned()
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.inner
            .lock()
            .expect("table cache mutex poisoned")
            .tables
            .contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("table cache mutex poisoned")
            .tables
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached source ids, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("table cache mutex poisoned");
        let mut ids: Vec<String> = inner.tables.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn stats_snapshot(&self) -> TableCacheStats {
        self.inner.lock().expect("table cache mutex poisoned").stats
    }

    /// Drop the parsed table for `source_id`. The next lookup re-reads the persistent store.
    pub fn invalidate(&self, source_id: &str) -> bool {
        self.inner
            .lock()
            .expect("table cache mutex poisoned")
            .tables
            .remove(source_id)
            .is_some()
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("table cache mutex poisoned")
            .tables
            .clear();
    }

    pub(crate) fn install(&self, source_id: &str, table: Arc<ParsedTable>) {
        self.inner
            .lock()
            .expect("table cache mutex poisoned")
            .tables
            .insert(source_id.to_string(), table);
    }

    /// The lock serializing resolution and refresh of one source. Created on first use and
    /// kept for the lifetime of the cache.
    pub(crate) fn source_lock(&self, source_id: &str) -> Arc<AsyncMutex<()>> {
        let mut inner = self.inner.lock().expect("table cache mutex poisoned");
        inner
            .locks
            .entry(source_id.to_string())
            .or_default()
            .clone()
    }

    pub(crate) fn record(&self, update: impl FnOnce(&mut TableCacheStats)) {
        let mut inner = self.inner.lock().expect("table cache mutex poisoned");
        update(&mut inner.stats);
    }
}
