//! Transaction submission
//!
//! `submit` runs, in order:
//! 1. Duplicate guard reservation (requests without a token skip it)
//! 2. Validation
//! 3. Available-balance check when the sender banks here
//! 4. Insert into the ledger
//! 5. Confirm the reservation with the new id
//!
//! Any failure before step 5 releases the reservation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ledger_store::LedgerStore;
use thiserror::Error;
use tracing::{error, info};
use types::errors::{StoreError, ValidationError};
use types::ids::{AccountNumber, RoutingNumber};
use types::transaction::{Transaction, TransactionRequest};

use crate::balance_client::{BalanceLookupError, BalanceSource};
use crate::dedup::{DuplicateError, DuplicateGuard};
use crate::metrics::WriterMetrics;
use crate::validator;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("unable to add duplicate transaction: {0}")]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("insufficient balance [balance={balance}, amount={amount}]")]
    InsufficientBalance { balance: i64, amount: i64 },

    #[error(transparent)]
    BalanceUnavailable(#[from] BalanceLookupError),

    #[error("unable to persist transaction: {0}")]
    Store(#[from] StoreError),
}

/// The authenticated submitter
#[derive(Debug, Clone)]
pub struct Caller {
    pub account: AccountNumber,
    /// Raw bearer token, forwarded to the balance service
    pub bearer_token: String,
}

pub struct LedgerWriter {
    store: Arc<dyn LedgerStore>,
    balances: Arc<dyn BalanceSource>,
    guard: DuplicateGuard,
    local_routing: RoutingNumber,
    metrics: WriterMetrics,
}

impl LedgerWriter {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        balances: Arc<dyn BalanceSource>,
        local_routing: RoutingNumber,
        dedup_window: Duration,
    ) -> Self {
        Self {
            store,
            balances,
            guard: DuplicateGuard::new(dedup_window),
            local_routing,
            metrics: WriterMetrics::new(),
        }
    }

    pub fn guard(&self) -> &DuplicateGuard {
        &self.guard
    }

    pub fn export_metrics(&self) -> BTreeMap<String, i64> {
        let mut m = self.metrics.export();
        m.insert("writer_tracked_tokens".to_string(), self.guard.len() as i64);
        m
    }

    pub async fn submit(&self, caller: &Caller, request: &TransactionRequest) -> Result<Transaction, SubmitError> {
        let reservation = match request.token() {
            Some(token) => match self.guard.reserve(token) {
                Ok(reservation) => Some(reservation),
                Err(err) => {
                    self.metrics.record(&self.metrics.duplicates);
                    error!(request_uuid = token, "Duplicate transaction add attempted");
                    return Err(err.into());
                }
            },
            None => None,
        };

        let transaction = validator::validate(&self.local_routing, &caller.account, request).map_err(|err| {
            self.metrics.record(&self.metrics.validation_failures);
            error!(reason = err.reason().code(), error = %err, "Transaction failed validation check");
            err
        })?;

        if transaction.from_routing == self.local_routing {
            let balance = self
                .balances
                .available_balance(&caller.bearer_token, &transaction.from_account)
                .await
                .map_err(|err| {
                    self.metrics.record(&self.metrics.balance_lookup_failures);
                    error!(account_id = %transaction.from_account, error = %err, "Failed to retrieve account balance");
                    err
                })?;
            if balance < transaction.amount {
                self.metrics.record(&self.metrics.insufficient_balance);
                error!(
                    account_id = %transaction.from_account,
                    balance,
                    amount = transaction.amount,
                    "Transaction submission failed: Insufficient balance"
                );
                return Err(SubmitError::InsufficientBalance {
                    balance,
                    amount: transaction.amount,
                });
            }
        }

        let persisted = self.store.insert(transaction).await.map_err(|err| {
            self.metrics.record(&self.metrics.store_failures);
            error!(error = %err, "Unable to persist transaction");
            err
        })?;

        if let Some(reservation) = reservation {
            reservation.confirm(persisted.transaction_id);
        }
        self.metrics.record(&self.metrics.accepted);
        info!(transaction = %persisted, "Submitted transaction successfully");
        Ok(persisted)
    }
}
