//! Ledger Cursor/Poller
//!
//! Tails the ledger by id and drives replay. State machine per tick:
//!
//! ```text
//! Uninitialized ──(max id read)──► Steady
//!
//! Steady, remote = latest ledger id:
//!   remote > cursor  → replay rows after cursor in order, advance per row
//!   remote == cursor → idle
//!   remote < cursor  → out of sync, replay suspended until remote >= cursor
//!   store error      → no progress, retried next tick
//! ```
//!
//! The cursor only moves past a row after every callback accepted it, so a
//! failed tick resumes at the failing row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use ledger_store::LedgerStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use types::ids::TransactionId;

use crate::callback::ReplayCallback;
use crate::metrics::ReaderMetrics;

/// Poller bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Highest id already replayed
    pub last_processed_id: TransactionId,
    pub initialized: bool,
}

impl Cursor {
    const UNINITIALIZED: Cursor = Cursor {
        last_processed_id: TransactionId::BEFORE_FIRST,
        initialized: false,
    };
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Cursor set from the ledger's current max id
    Initialized { cursor: TransactionId },
    /// Nothing new
    Idle,
    /// Every fetched row was replayed
    Replayed { count: usize, cursor: TransactionId },
    /// A callback refused `failed_at`; the cursor stopped before it
    ReplayAborted {
        replayed: usize,
        cursor: TransactionId,
        failed_at: TransactionId,
    },
    /// Reading the rows after the cursor failed
    FetchFailed,
    /// The ledger's max id is behind the cursor
    Regressed { remote: TransactionId, cursor: TransactionId },
    /// The max id could not be read
    StoreUnavailable,
}

pub struct LedgerReader {
    store: Arc<dyn LedgerStore>,
    callback: Arc<dyn ReplayCallback>,
    metrics: Arc<ReaderMetrics>,
    cursor: Mutex<Cursor>,
    published: StdMutex<Cursor>,
    last_run: StdMutex<Option<Instant>>,
    out_of_sync: AtomicBool,
}

impl LedgerReader {
    pub fn new(store: Arc<dyn LedgerStore>, callback: Arc<dyn ReplayCallback>, metrics: Arc<ReaderMetrics>) -> Self {
        Self {
            store,
            callback,
            metrics,
            cursor: Mutex::new(Cursor::UNINITIALIZED),
            published: StdMutex::new(Cursor::UNINITIALIZED),
            last_run: StdMutex::new(None),
            out_of_sync: AtomicBool::new(false),
        }
    }

    /// Start from an explicit cursor instead of the ledger's max id.
    ///
    /// Every row after `id` is replayed, which backfills caches.
    pub fn starting_after(mut self, id: TransactionId) -> Self {
        let cursor = Cursor {
            last_processed_id: id,
            initialized: true,
        };
        *self.cursor.get_mut() = cursor;
        self.publish(cursor);
        self
    }

    /// Start of the most recent tick
    pub fn last_run(&self) -> Option<Instant> {
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cursor(&self) -> Cursor {
        *self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_processed_id(&self) -> TransactionId {
        self.cursor().last_processed_id
    }

    /// Whether the last observed max id was behind the cursor
    pub fn is_out_of_sync(&self) -> bool {
        self.out_of_sync.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> &ReaderMetrics {
        &self.metrics
    }

    /// Run one poll. Never panics on store or callback failure.
    pub async fn tick(&self) -> TickOutcome {
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.metrics.record_tick();

        let mut cursor = self.cursor.lock().await;

        if !cursor.initialized {
            return match self.store.latest_transaction_id().await {
                Ok(latest) => {
                    let id = latest.unwrap_or(TransactionId::BEFORE_FIRST);
                    *cursor = Cursor {
                        last_processed_id: id,
                        initialized: true,
                    };
                    self.publish(*cursor);
                    info!(latest_transaction_id = %id, "Initialized ledger cursor");
                    TickOutcome::Initialized { cursor: id }
                }
                Err(err) => {
                    self.metrics.record_store_error();
                    warn!(error = %err, "Could not read latest transaction id, cursor stays uninitialized");
                    TickOutcome::StoreUnavailable
                }
            };
        }

        let remote = match self.store.latest_transaction_id().await {
            Ok(latest) => latest.unwrap_or(TransactionId::BEFORE_FIRST),
            Err(err) => {
                self.metrics.record_store_error();
                warn!(error = %err, cursor = %cursor.last_processed_id, "Could not reach ledger, skipping poll");
                return TickOutcome::StoreUnavailable;
            }
        };

        let current = cursor.last_processed_id;
        if remote < current {
            if !self.out_of_sync.swap(true, Ordering::SeqCst) {
                self.metrics.record_regression();
            }
            error!(
                remote_transaction_id = %remote,
                latest_transaction_id = %current,
                "Remote transaction id out of sync"
            );
            return TickOutcome::Regressed { remote, cursor: current };
        }
        if self.out_of_sync.swap(false, Ordering::SeqCst) {
            info!(remote_transaction_id = %remote, latest_transaction_id = %current, "Ledger back in sync");
        }
        if remote == current {
            return TickOutcome::Idle;
        }

        let rows = match self.store.transactions_after(current).await {
            Ok(rows) => rows,
            Err(err) => {
                self.metrics.record_store_error();
                error!(error = %err, latest_transaction_id = %current, "Could not fetch new transactions");
                return TickOutcome::FetchFailed;
            }
        };
        debug!(count = rows.len(), after = %current, "Polled new transactions");

        let mut replayed = 0;
        for transaction in &rows {
            let id = transaction.transaction_id;
            if id <= cursor.last_processed_id {
                self.metrics.record_skipped_row();
                warn!(transaction_id = %id, cursor = %cursor.last_processed_id, "Skipping row at or below cursor");
                continue;
            }

            if let Err(err) = self.callback.process_transaction(transaction).await {
                self.metrics.record_callback_failure();
                error!(transaction_id = %id, error = %err, "Replay failed, will retry next poll");
                return TickOutcome::ReplayAborted {
                    replayed,
                    cursor: cursor.last_processed_id,
                    failed_at: id,
                };
            }

            cursor.last_processed_id = id;
            self.publish(*cursor);
            self.metrics.record_replayed(id);
            replayed += 1;
        }

        TickOutcome::Replayed {
            count: replayed,
            cursor: cursor.last_processed_id,
        }
    }

    /// Poll forever with a fixed delay between ticks.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        info!(interval_ms = interval.as_millis() as u64, "Starting ledger poller");
        loop {
            self.tick().await;
            tokio::time::sleep(interval).await;
        }
    }

    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(self.run(interval))
    }

    fn publish(&self, cursor: Cursor) {
        *self.published.lock().unwrap_or_else(PoisonError::into_inner) = cursor;
        self.metrics.set_last_processed_id(cursor.last_processed_id);
    }
}
