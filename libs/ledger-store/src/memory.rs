//! In-memory ledger table
//!
//! Backs the demo gateway and the test suites. Behaves like the external
//! SQL table: ids start at 1 and increase by one per insert, every read is a
//! consistent snapshot. Fault injection covers the two store failure modes
//! the readers must survive: connectivity loss and a reset that makes the
//! max id go backwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use types::errors::StoreError;
use types::ids::{AccountNumber, RoutingNumber, TransactionId};
use types::transaction::{NewTransaction, Transaction};

use crate::{BalanceSnapshot, HistorySnapshot, LedgerStore};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Transaction>,
    next_id: i64,
}

impl Table {
    fn latest(&self) -> TransactionId {
        self.rows
            .last()
            .map(|tx| tx.transaction_id)
            .unwrap_or(TransactionId::BEFORE_FIRST)
    }
}

/// Append-only ledger held in process memory
#[derive(Debug)]
pub struct MemoryLedger {
    table: Mutex<Table>,
    available: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                rows: Vec::new(),
                next_id: 1,
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate connectivity loss (`false`) or recovery (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Drop every row with id greater than `keep_through` and restart id
    /// assignment after it, as a restored backup would.
    pub fn reset_to(&self, keep_through: TransactionId) {
        let mut table = self.lock();
        table.rows.retain(|tx| tx.transaction_id <= keep_through);
        table.next_id = keep_through.get().max(0) + 1;
        warn!(keep_through = %keep_through, "Ledger table reset");
    }

    /// Number of persisted rows
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every persisted row, ascending by id
    pub fn rows(&self) -> Vec<Transaction> {
        self.lock().rows.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("ledger database unreachable".to_string()))
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn latest_transaction_id(&self) -> Result<Option<TransactionId>, StoreError> {
        self.check_available()?;
        Ok(self.lock().rows.last().map(|tx| tx.transaction_id))
    }

    async fn transactions_after(&self, after: TransactionId) -> Result<Vec<Transaction>, StoreError> {
        self.check_available()?;
        let table = self.lock();
        // Rows are stored in id order, so the tail after the partition point is the answer
        let start = table.rows.partition_point(|tx| tx.transaction_id <= after);
        Ok(table.rows[start..].to_vec())
    }

    async fn insert(&self, transaction: NewTransaction) -> Result<Transaction, StoreError> {
        self.check_available()?;
        let mut table = self.lock();
        let id = TransactionId::new(table.next_id);
        table.next_id += 1;
        let persisted = Transaction::persisted(id, transaction, Utc::now());
        debug!(transaction_id = %id, "Inserted ledger row");
        table.rows.push(persisted.clone());
        Ok(persisted)
    }

    async fn recent_transactions_for_account(
        &self,
        account: &AccountNumber,
        routing: &RoutingNumber,
        limit: usize,
    ) -> Result<HistorySnapshot, StoreError> {
        self.check_available()?;
        let table = self.lock();
        let transactions = table
            .rows
            .iter()
            .rev()
            .filter(|tx| tx.is_debit_for(account, routing) || tx.is_credit_for(account, routing))
            .take(limit)
            .cloned()
            .collect();
        Ok(HistorySnapshot {
            transactions,
            as_of: table.latest(),
        })
    }

    async fn net_balance_for_account(
        &self,
        account: &AccountNumber,
        routing: &RoutingNumber,
    ) -> Result<BalanceSnapshot, StoreError> {
        self.check_available()?;
        let table = self.lock();
        let balance = table
            .rows
            .iter()
            .try_fold(0i64, |sum, tx| sum.checked_add(tx.delta_for(account, routing)))
            .ok_or_else(|| StoreError::Query(format!("balance of account {account} overflows")))?;
        Ok(BalanceSnapshot {
            balance,
            as_of: table.latest(),
        })
    }
}
