//! Writer metrics

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct WriterMetrics {
    pub accepted: AtomicU64,
    pub duplicates: AtomicU64,
    pub validation_failures: AtomicU64,
    pub insufficient_balance: AtomicU64,
    pub balance_lookup_failures: AtomicU64,
    pub store_failures: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn export(&self) -> BTreeMap<String, i64> {
        let mut m = BTreeMap::new();
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed) as i64;
        m.insert("writer_accepted".to_string(), load(&self.accepted));
        m.insert("writer_duplicates".to_string(), load(&self.duplicates));
        m.insert("writer_validation_failures".to_string(), load(&self.validation_failures));
        m.insert("writer_insufficient_balance".to_string(), load(&self.insufficient_balance));
        m.insert("writer_balance_lookup_failures".to_string(), load(&self.balance_lookup_failures));
        m.insert("writer_store_failures".to_string(), load(&self.store_failures));
        m
    }
}
