//! Balance cache
//!
//! Account number → running balance for accounts of the local bank. An entry
//! is loaded from the ledger on first read and then kept current by replay.
//!
//! Each entry remembers the ledger watermark it reflects. Replay only applies
//! transactions newer than the watermark, so a row seen both by a lazy load
//! and by replay counts once.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ledger_store::LedgerStore;
use tracing::{debug, error};
use types::ids::{AccountNumber, RoutingNumber, TransactionId};
use types::transaction::Transaction;

use crate::callback::{ReplayCallback, ReplayError};
use crate::loading_cache::{CacheConfig, CacheError, LoadingCache};
use crate::metrics::export_cache_stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BalanceEntry {
    balance: i64,
    as_of: TransactionId,
}

pub struct BalanceCache {
    store: Arc<dyn LedgerStore>,
    local_routing: RoutingNumber,
    cache: LoadingCache<AccountNumber, BalanceEntry>,
}

impl BalanceCache {
    pub fn new(store: Arc<dyn LedgerStore>, local_routing: RoutingNumber, max_size: usize) -> Self {
        Self {
            store,
            local_routing,
            cache: LoadingCache::new(CacheConfig {
                max_size,
                expire_after_write: None,
            }),
        }
    }

    /// Balance of a local account, loading it from the ledger on a miss.
    pub async fn get_balance(&self, account: &AccountNumber) -> Result<i64, CacheError> {
        let store = &self.store;
        let routing = &self.local_routing;
        let entry = self
            .cache
            .get_with(account, || async move {
                let snapshot = store
                    .net_balance_for_account(account, routing)
                    .await
                    .map_err(CacheError::from)?;
                debug!(
                    account_id = %account,
                    balance = snapshot.balance,
                    as_of = %snapshot.as_of,
                    "Loaded balance into cache"
                );
                Ok::<_, CacheError>(BalanceEntry {
                    balance: snapshot.balance,
                    as_of: snapshot.as_of,
                })
            })
            .await?;
        Ok(entry.balance)
    }

    /// Cached balance without touching the ledger
    pub async fn cached_balance(&self, account: &AccountNumber) -> Option<i64> {
        self.cache.get_if_present(account).await.map(|entry| entry.balance)
    }

    pub fn export_metrics(&self) -> BTreeMap<String, i64> {
        export_cache_stats("balance_cache", self.cache.stats(), self.cache.len())
    }

    /// Local accounts touched by `transaction`, each listed once
    fn local_accounts<'a>(&self, transaction: &'a Transaction) -> Vec<&'a AccountNumber> {
        let mut accounts = Vec::with_capacity(2);
        if transaction.from_routing == self.local_routing {
            accounts.push(&transaction.from_account);
        }
        if transaction.to_routing == self.local_routing && !accounts.contains(&&transaction.to_account) {
            accounts.push(&transaction.to_account);
        }
        accounts
    }
}

#[async_trait]
impl ReplayCallback for BalanceCache {
    async fn process_transaction(&self, transaction: &Transaction) -> Result<(), ReplayError> {
        let id = transaction.transaction_id;
        for account in self.local_accounts(transaction) {
            let delta = transaction.delta_for(account, &self.local_routing);
            let outcome = self
                .cache
                .update_if_present(account, |entry| -> Result<bool, ReplayError> {
                    if id <= entry.as_of {
                        return Ok(false);
                    }
                    entry.balance = entry
                        .balance
                        .checked_add(delta)
                        .ok_or_else(|| ReplayError::failed(id, format!("balance overflow for account {account}")))?;
                    entry.as_of = id;
                    Ok(true)
                })
                .await;
            match outcome {
                Some(Ok(true)) => {
                    debug!(account_id = %account, transaction_id = %id, delta, "Applied transaction to cached balance")
                }
                Some(Err(err)) => {
                    error!(account_id = %account, transaction_id = %id, delta, "Cached balance would overflow");
                    return Err(err);
                }
                Some(Ok(false)) | None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_store::MemoryLedger;
    use types::transaction::NewTransaction;

    const LOCAL: &str = "883745000";
    const REMOTE: &str = "808889588";

    fn transfer(from: &str, from_routing: &str, to: &str, to_routing: &str, amount: i64) -> NewTransaction {
        NewTransaction {
            from_account: AccountNumber::from(from),
            from_routing: RoutingNumber::from(from_routing),
            to_account: AccountNumber::from(to),
            to_routing: RoutingNumber::from(to_routing),
            amount,
            idempotency_token: None,
        }
    }

    fn setup() -> (Arc<MemoryLedger>, BalanceCache) {
        let ledger = Arc::new(MemoryLedger::new());
        let cache = BalanceCache::new(ledger.clone(), RoutingNumber::from(LOCAL), 100);
        (ledger, cache)
    }

    #[tokio::test]
    async fn test_lazy_load_sums_ledger() {
        let (ledger, cache) = setup();
        let alice = AccountNumber::from("1111111111");
        ledger.insert(transfer("9999999999", LOCAL, "1111111111", LOCAL, 1000)).await.unwrap();
        ledger.insert(transfer("1111111111", LOCAL, "2222222222", LOCAL, 250)).await.unwrap();

        assert_eq!(cache.cached_balance(&alice).await, None);
        assert_eq!(cache.get_balance(&alice).await.unwrap(), 750);
        assert_eq!(cache.cached_balance(&alice).await, Some(750));
    }

    #[tokio::test]
    async fn test_replay_skips_unloaded_accounts() {
        let (ledger, cache) = setup();
        let tx = ledger.insert(transfer("1111111111", LOCAL, "2222222222", LOCAL, 5)).await.unwrap();
        cache.process_transaction(&tx).await.unwrap();
        assert_eq!(cache.cached_balance(&AccountNumber::from("1111111111")).await, None);
        assert_eq!(cache.export_metrics()["balance_cache_entries"], 0);
    }

    #[tokio::test]
    async fn test_replay_applies_new_transactions_once() {
        let (ledger, cache) = setup();
        let alice = AccountNumber::from("1111111111");
        let bob = AccountNumber::from("2222222222");
        assert_eq!(cache.get_balance(&alice).await.unwrap(), 0);
        assert_eq!(cache.get_balance(&bob).await.unwrap(), 0);

        let tx = ledger.insert(transfer("1111111111", LOCAL, "2222222222", LOCAL, 40)).await.unwrap();
        cache.process_transaction(&tx).await.unwrap();
        cache.process_transaction(&tx).await.unwrap();

        assert_eq!(cache.get_balance(&alice).await.unwrap(), -40);
        assert_eq!(cache.get_balance(&bob).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_replay_ignores_rows_already_in_load() {
        let (ledger, cache) = setup();
        let alice = AccountNumber::from("1111111111");
        let tx = ledger.insert(transfer("9999999999", LOCAL, "1111111111", LOCAL, 70)).await.unwrap();

        // The load already saw the row
        assert_eq!(cache.get_balance(&alice).await.unwrap(), 70);
        cache.process_transaction(&tx).await.unwrap();
        assert_eq!(cache.get_balance(&alice).await.unwrap(), 70);
    }

    #[tokio::test]
    async fn test_remote_side_is_not_cached() {
        let (ledger, cache) = setup();
        let alice = AccountNumber::from("1111111111");
        cache.get_balance(&alice).await.unwrap();

        // Same account number at another bank is a different account
        let tx = ledger.insert(transfer("3333333333", REMOTE, "1111111111", REMOTE, 10)).await.unwrap();
        cache.process_transaction(&tx).await.unwrap();
        assert_eq!(cache.get_balance(&alice).await.unwrap(), 0);

        let tx = ledger.insert(transfer("3333333333", REMOTE, "1111111111", LOCAL, 10)).await.unwrap();
        cache.process_transaction(&tx).await.unwrap();
        assert_eq!(cache.get_balance(&alice).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_overflowing_credit_fails_without_touching_entry() {
        let (ledger, cache) = setup();
        let alice = AccountNumber::from("1111111111");
        ledger.insert(transfer("3333333333", REMOTE, "1111111111", LOCAL, i64::MAX)).await.unwrap();
        assert_eq!(cache.get_balance(&alice).await.unwrap(), i64::MAX);

        let tx = ledger.insert(transfer("3333333333", REMOTE, "1111111111", LOCAL, i64::MAX)).await.unwrap();
        let err = cache.process_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, ReplayError::Failed { id, .. } if id == tx.transaction_id));
        assert_eq!(cache.cached_balance(&alice).await, Some(i64::MAX));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_distinct_error() {
        let (ledger, cache) = setup();
        ledger.set_available(false);
        let err = cache.get_balance(&AccountNumber::from("1111111111")).await.unwrap_err();
        assert!(matches!(err, CacheError::StoreUnavailable(_)));
        assert_eq!(cache.export_metrics()["balance_cache_load_failures"], 1);
    }
}
