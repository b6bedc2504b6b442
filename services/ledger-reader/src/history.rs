//! Transaction history cache
//!
//! Account number → the account's most recent transactions, newest first,
//! capped at `history_limit`. Loaded lazily from the ledger; replay prepends
//! rows newer than the entry's watermark and drops the oldest on overflow.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ledger_store::{HistorySnapshot, LedgerStore};
use tracing::{debug, warn};
use types::ids::{AccountNumber, RoutingNumber, TransactionId};
use types::transaction::Transaction;

use crate::callback::{ReplayCallback, ReplayError};
use crate::loading_cache::{CacheConfig, CacheError, LoadingCache};
use crate::metrics::export_cache_stats;

#[derive(Debug, Clone)]
struct HistoryEntry {
    transactions: VecDeque<Transaction>,
    as_of: TransactionId,
}

impl HistoryEntry {
    fn from_snapshot(snapshot: HistorySnapshot, limit: usize) -> Self {
        let mut transactions = VecDeque::from(snapshot.transactions);
        transactions.truncate(limit);
        Self {
            transactions,
            as_of: snapshot.as_of,
        }
    }
}

/// History cache settings
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub history_limit: usize,
    pub max_size: usize,
    pub expire_after_write: Option<Duration>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            max_size: 1_000_000,
            expire_after_write: Some(Duration::from_secs(60 * 60)),
        }
    }
}

pub struct HistoryCache {
    store: Arc<dyn LedgerStore>,
    local_routing: RoutingNumber,
    history_limit: usize,
    cache: LoadingCache<AccountNumber, HistoryEntry>,
}

impl HistoryCache {
    pub fn new(store: Arc<dyn LedgerStore>, local_routing: RoutingNumber, config: HistoryConfig) -> Self {
        Self {
            store,
            local_routing,
            history_limit: config.history_limit,
            cache: LoadingCache::new(CacheConfig {
                max_size: config.max_size,
                expire_after_write: config.expire_after_write,
            }),
        }
    }

    /// Recent transactions of a local account, newest first.
    pub async fn get_history(&self, account: &AccountNumber) -> Result<Vec<Transaction>, CacheError> {
        let entry = self.cache.get_with(account, || self.load(account)).await?;
        Ok(entry.transactions.into_iter().collect())
    }

    /// Reload the account's history from the ledger.
    pub async fn refresh(&self, account: &AccountNumber) -> Result<(), CacheError> {
        self.cache.refresh_with(account, || self.load(account)).await
    }

    pub fn export_metrics(&self) -> BTreeMap<String, i64> {
        export_cache_stats("history_cache", self.cache.stats(), self.cache.len())
    }

    async fn load(&self, account: &AccountNumber) -> Result<HistoryEntry, CacheError> {
        let snapshot = self
            .store
            .recent_transactions_for_account(account, &self.local_routing, self.history_limit)
            .await?;
        if snapshot.transactions.is_empty() {
            warn!(account_id = %account, "No transactions found for account");
        }
        debug!(
            account_id = %account,
            count = snapshot.transactions.len(),
            as_of = %snapshot.as_of,
            "Loaded history into cache"
        );
        Ok(HistoryEntry::from_snapshot(snapshot, self.history_limit))
    }
}

#[async_trait]
impl ReplayCallback for HistoryCache {
    async fn process_transaction(&self, transaction: &Transaction) -> Result<(), ReplayError> {
        let id = transaction.transaction_id;
        let mut accounts = Vec::with_capacity(2);
        if transaction.from_routing == self.local_routing {
            accounts.push(&transaction.from_account);
        }
        if transaction.to_routing == self.local_routing && !accounts.contains(&&transaction.to_account) {
            accounts.push(&transaction.to_account);
        }

        for account in accounts {
            let limit = self.history_limit;
            let applied = self
                .cache
                .update_if_present(account, |entry| {
                    if id <= entry.as_of {
                        return false;
                    }
                    entry.transactions.push_front(transaction.clone());
                    entry.transactions.truncate(limit);
                    entry.as_of = id;
                    true
                })
                .await;
            if applied == Some(true) {
                debug!(account_id = %account, transaction_id = %id, "Prepended transaction to cached history");
            }
        }
        Ok(())
    }
}
