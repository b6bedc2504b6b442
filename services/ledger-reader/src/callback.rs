//! Replay callbacks
//!
//! The poller hands every newly observed ledger row to a [`ReplayCallback`],
//! strictly in id order. A callback that returns an error stops the tick at
//! that row; the row is offered again on the next tick, so callbacks must
//! tolerate seeing a row they already applied.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use types::ids::TransactionId;
use types::transaction::Transaction;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Replay of transaction {id} failed: {reason}")]
    Failed { id: TransactionId, reason: String },
}

impl ReplayError {
    pub fn failed(id: TransactionId, reason: impl Into<String>) -> Self {
        ReplayError::Failed {
            id,
            reason: reason.into(),
        }
    }
}

/// Consumer of replayed ledger rows
#[async_trait]
pub trait ReplayCallback: Send + Sync {
    async fn process_transaction(&self, transaction: &Transaction) -> Result<(), ReplayError>;
}

/// Runs several callbacks for each row, in registration order.
///
/// Stops at the first failing callback. Callbacks before it have already
/// applied the row and will see it again on retry.
#[derive(Default, Clone)]
pub struct FanOut {
    callbacks: Vec<Arc<dyn ReplayCallback>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, callback: Arc<dyn ReplayCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[async_trait]
impl ReplayCallback for FanOut {
    async fn process_transaction(&self, transaction: &Transaction) -> Result<(), ReplayError> {
        for callback in &self.callbacks {
            callback.process_transaction(transaction).await?;
        }
        Ok(())
    }
}
