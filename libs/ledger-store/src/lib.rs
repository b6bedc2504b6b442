//! Ledger Store interface
//!
//! The ledger is an append-only table of transactions whose ids are assigned
//! at insert time and only ever grow. Readers tail it by id; the writer
//! appends one row at a time.
//!
//! Reads used to populate caches return a snapshot watermark (`as_of`), the
//! highest ledger id visible to that read. A cache that remembers the
//! watermark can tell whether a replayed transaction is already reflected in
//! the value it loaded.

pub mod memory;

use async_trait::async_trait;
use types::errors::StoreError;
use types::ids::{AccountNumber, RoutingNumber, TransactionId};
use types::transaction::{NewTransaction, Transaction};

pub use memory::MemoryLedger;

/// Net balance of one account as seen by a single consistent read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Credits minus debits
    pub balance: i64,
    /// Highest ledger id included in `balance`
    pub as_of: TransactionId,
}

/// Most recent transactions of one account, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub transactions: Vec<Transaction>,
    /// Highest ledger id visible to the read
    pub as_of: TransactionId,
}

/// Append-only transaction table
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Id of the newest row, or `None` when the ledger is empty
    async fn latest_transaction_id(&self) -> Result<Option<TransactionId>, StoreError>;

    /// Every row with id greater than `after`, ascending by id
    async fn transactions_after(&self, after: TransactionId) -> Result<Vec<Transaction>, StoreError>;

    /// Append a row and return it with its assigned id
    async fn insert(&self, transaction: NewTransaction) -> Result<Transaction, StoreError>;

    /// Up to `limit` rows touching the account, newest first
    async fn recent_transactions_for_account(
        &self,
        account: &AccountNumber,
        routing: &RoutingNumber,
        limit: usize,
    ) -> Result<HistorySnapshot, StoreError>;

    /// Credits minus debits for the account
    async fn net_balance_for_account(
        &self,
        account: &AccountNumber,
        routing: &RoutingNumber,
    ) -> Result<BalanceSnapshot, StoreError>;
}
