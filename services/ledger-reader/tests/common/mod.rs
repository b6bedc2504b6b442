//! Shared fixtures for the ledger reader integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ledger_reader::{ReplayCallback, ReplayError};
use ledger_store::{BalanceSnapshot, HistorySnapshot, LedgerStore, MemoryLedger};
use tokio::sync::Notify;
use types::errors::StoreError;
use types::ids::{AccountNumber, RoutingNumber, TransactionId};
use types::transaction::{NewTransaction, Transaction};

pub const LOCAL: &str = "883745000";
pub const REMOTE: &str = "808889588";

pub fn transfer(from: &str, to: &str, amount: i64) -> NewTransaction {
    transfer_between(from, LOCAL, to, LOCAL, amount)
}

pub fn transfer_between(from: &str, from_routing: &str, to: &str, to_routing: &str, amount: i64) -> NewTransaction {
    NewTransaction {
        from_account: AccountNumber::from(from),
        from_routing: RoutingNumber::from(from_routing),
        to_account: AccountNumber::from(to),
        to_routing: RoutingNumber::from(to_routing),
        amount,
        idempotency_token: None,
    }
}

pub fn local() -> RoutingNumber {
    RoutingNumber::from(LOCAL)
}

/// Records replayed ids in the order they arrive
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<i64>>,
}

impl Recorder {
    pub fn seen(&self) -> Vec<i64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplayCallback for Recorder {
    async fn process_transaction(&self, tx: &Transaction) -> Result<(), ReplayError> {
        self.seen.lock().unwrap().push(tx.transaction_id.get());
        Ok(())
    }
}

/// Fails exactly once for each id in its set
#[derive(Default)]
pub struct FailOnce {
    pending: Mutex<HashSet<i64>>,
}

impl FailOnce {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            pending: Mutex::new(ids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ReplayCallback for FailOnce {
    async fn process_transaction(&self, tx: &Transaction) -> Result<(), ReplayError> {
        if self.pending.lock().unwrap().remove(&tx.transaction_id.get()) {
            return Err(ReplayError::failed(tx.transaction_id, "injected failure"));
        }
        Ok(())
    }
}

/// Store wrapper that counts balance loads and can park one of them
///
/// When armed, the next balance read takes its snapshot, signals `entered`
/// and waits for `gate` before returning.
pub struct InstrumentedStore {
    pub inner: Arc<MemoryLedger>,
    pub balance_loads: AtomicUsize,
    pub load_delay: Option<Duration>,
    armed: AtomicBool,
    pub entered: Notify,
    pub gate: Notify,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<MemoryLedger>) -> Self {
        Self {
            inner,
            balance_loads: AtomicUsize::new(0),
            load_delay: None,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn balance_loads(&self) -> usize {
        self.balance_loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for InstrumentedStore {
    async fn latest_transaction_id(&self) -> Result<Option<TransactionId>, StoreError> {
        self.inner.latest_transaction_id().await
    }

    async fn transactions_after(&self, after: TransactionId) -> Result<Vec<Transaction>, StoreError> {
        self.inner.transactions_after(after).await
    }

    async fn insert(&self, transaction: NewTransaction) -> Result<Transaction, StoreError> {
        self.inner.insert(transaction).await
    }

    async fn recent_transactions_for_account(
        &self,
        account: &AccountNumber,
        routing: &RoutingNumber,
        limit: usize,
    ) -> Result<HistorySnapshot, StoreError> {
        self.inner.recent_transactions_for_account(account, routing, limit).await
    }

    async fn net_balance_for_account(
        &self,
        account: &AccountNumber,
        routing: &RoutingNumber,
    ) -> Result<BalanceSnapshot, StoreError> {
        self.balance_loads.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.inner.net_balance_for_account(account, routing).await?;
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        Ok(snapshot)
    }
}
