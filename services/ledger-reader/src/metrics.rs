//! Reader metrics
//!
//! Counters for the poller, exported alongside the cache stats.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use types::ids::TransactionId;

use crate::loading_cache::CacheStats;

pub struct ReaderMetrics {
    pub ticks: AtomicU64,
    pub transactions_replayed: AtomicU64,
    pub store_errors: AtomicU64,
    pub regressions: AtomicU64,
    pub callback_failures: AtomicU64,
    pub skipped_rows: AtomicU64,
    last_processed_id: AtomicI64,
}

impl ReaderMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            transactions_replayed: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            regressions: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            skipped_rows: AtomicU64::new(0),
            last_processed_id: AtomicI64::new(TransactionId::BEFORE_FIRST.get()),
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one row replayed and the cursor moving to it.
    pub fn record_replayed(&self, id: TransactionId) {
        self.transactions_replayed.fetch_add(1, Ordering::Relaxed);
        self.last_processed_id.store(id.get(), Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_regression(&self) {
        self.regressions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_row(&self) {
        self.skipped_rows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_processed_id(&self, id: TransactionId) {
        self.last_processed_id.store(id.get(), Ordering::Relaxed);
    }

    pub fn last_processed_id(&self) -> TransactionId {
        TransactionId::new(self.last_processed_id.load(Ordering::Relaxed))
    }

    /// Export counters keyed by metric name.
    ///
    /// The cursor is exported as-is, so it can be the -1 sentinel.
    pub fn export(&self) -> BTreeMap<String, i64> {
        let mut m = BTreeMap::new();
        let counter = |value: &AtomicU64| value.load(Ordering::Relaxed) as i64;
        m.insert("reader_ticks".to_string(), counter(&self.ticks));
        m.insert("reader_transactions_replayed".to_string(), counter(&self.transactions_replayed));
        m.insert("reader_store_errors".to_string(), counter(&self.store_errors));
        m.insert("reader_regressions".to_string(), counter(&self.regressions));
        m.insert("reader_callback_failures".to_string(), counter(&self.callback_failures));
        m.insert("reader_skipped_rows".to_string(), counter(&self.skipped_rows));
        m.insert("reader_last_processed_id".to_string(), self.last_processed_id().get());
        m
    }
}

impl Default for ReaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Export cache stats under `prefix`.
pub fn export_cache_stats(prefix: &str, stats: CacheStats, entries: usize) -> BTreeMap<String, i64> {
    let mut m = BTreeMap::new();
    m.insert(format!("{prefix}_hits"), stats.hits as i64);
    m.insert(format!("{prefix}_misses"), stats.misses as i64);
    m.insert(format!("{prefix}_load_successes"), stats.load_successes as i64);
    m.insert(format!("{prefix}_load_failures"), stats.load_failures as i64);
    m.insert(format!("{prefix}_evictions"), stats.evictions as i64);
    m.insert(format!("{prefix}_entries"), entries as i64);
    m
}
