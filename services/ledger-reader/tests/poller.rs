//! Poller scenarios against the in-memory ledger
//!
//! - Start on an empty ledger and drain a batch in order
//! - Store regression suspends replay
//! - Unreachable store makes no progress and recovers
//! - Callback failure aborts the tick and is retried without double counting

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{local, transfer, transfer_between, FailOnce, Recorder, REMOTE};
use ledger_reader::{
    BalanceCache, FanOut, HistoryCache, HistoryConfig, LedgerReader, ReaderMetrics, ScheduledTaskHealth, TickOutcome,
};
use ledger_store::{LedgerStore, MemoryLedger};
use types::ids::{AccountNumber, TransactionId};

struct Harness {
    ledger: Arc<MemoryLedger>,
    balances: Arc<BalanceCache>,
    history: Arc<HistoryCache>,
    recorder: Arc<Recorder>,
    metrics: Arc<ReaderMetrics>,
    reader: Arc<LedgerReader>,
}

fn harness_with(extra: Option<Arc<FailOnce>>) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let balances = Arc::new(BalanceCache::new(ledger.clone(), local(), 1000));
    let history = Arc::new(HistoryCache::new(
        ledger.clone(),
        local(),
        HistoryConfig {
            history_limit: 10,
            max_size: 1000,
            expire_after_write: None,
        },
    ));
    let recorder = Arc::new(Recorder::default());

    let mut fan_out = FanOut::new().with(balances.clone()).with(history.clone());
    if let Some(extra) = extra {
        fan_out = fan_out.with(extra);
    }
    let fan_out = fan_out.with(recorder.clone());

    let metrics = Arc::new(ReaderMetrics::new());
    let reader = Arc::new(LedgerReader::new(ledger.clone(), Arc::new(fan_out), metrics.clone()));
    Harness {
        ledger,
        balances,
        history,
        recorder,
        metrics,
        reader,
    }
}

fn harness() -> Harness {
    harness_with(None)
}

#[tokio::test]
async fn test_drain_from_empty_ledger() {
    let h = harness();
    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Initialized {
            cursor: TransactionId::BEFORE_FIRST
        }
    );

    // Cached before any row touches it
    let dave = AccountNumber::from("4444444444");
    assert_eq!(h.balances.get_balance(&dave).await.unwrap(), 0);

    h.ledger.insert(transfer("1111111111", "2222222222", 100)).await.unwrap();
    h.ledger.insert(transfer("3333333333", "4444444444", 25)).await.unwrap();
    h.ledger.insert(transfer("2222222222", "1111111111", 40)).await.unwrap();

    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Replayed {
            count: 3,
            cursor: TransactionId::new(3)
        }
    );
    assert_eq!(h.reader.last_processed_id(), TransactionId::new(3));
    assert_eq!(h.recorder.seen(), vec![1, 2, 3]);
    assert_eq!(h.balances.cached_balance(&dave).await, Some(25));

    // Accounts nobody asked for stay uncached
    assert_eq!(h.balances.cached_balance(&AccountNumber::from("1111111111")).await, None);

    assert_eq!(h.reader.tick().await, TickOutcome::Idle);
    assert_eq!(h.metrics.export()["reader_transactions_replayed"], 3);
}

#[tokio::test]
async fn test_order_holds_across_ticks() {
    let h = harness();
    h.reader.tick().await;
    for round in 0..4 {
        for amount in 1..=3 {
            h.ledger.insert(transfer("1111111111", "2222222222", round * 10 + amount)).await.unwrap();
        }
        h.reader.tick().await;
    }
    assert_eq!(h.recorder.seen(), (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_history_follows_replay() {
    let h = harness();
    h.reader.tick().await;
    let alice = AccountNumber::from("1111111111");
    assert!(h.history.get_history(&alice).await.unwrap().is_empty());

    h.ledger.insert(transfer("1111111111", "2222222222", 5)).await.unwrap();
    h.ledger.insert(transfer_between("9999999999", REMOTE, "1111111111", "883745000", 7)).await.unwrap();
    h.reader.tick().await;

    let amounts: Vec<i64> = h.history.get_history(&alice).await.unwrap().iter().map(|tx| tx.amount).collect();
    assert_eq!(amounts, vec![7, 5]);
}

#[tokio::test]
async fn test_regression_suspends_replay() {
    let h = harness();
    for amount in 1..=3 {
        h.ledger.insert(transfer("1111111111", "2222222222", amount)).await.unwrap();
    }
    let bob = AccountNumber::from("2222222222");
    h.reader.tick().await;
    assert_eq!(h.balances.get_balance(&bob).await.unwrap(), 6);

    h.ledger.reset_to(TransactionId::new(1));
    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Regressed {
            remote: TransactionId::new(1),
            cursor: TransactionId::new(3)
        }
    );
    assert!(h.reader.is_out_of_sync());

    // Still behind: nothing is replayed, nothing is reverted
    h.ledger.insert(transfer("1111111111", "2222222222", 100)).await.unwrap();
    assert!(matches!(h.reader.tick().await, TickOutcome::Regressed { .. }));
    assert_eq!(h.balances.cached_balance(&bob).await, Some(6));
    assert_eq!(h.reader.last_processed_id(), TransactionId::new(3));

    // Caught up to the cursor: resumes without special handling
    h.ledger.insert(transfer("1111111111", "2222222222", 100)).await.unwrap();
    assert_eq!(h.reader.tick().await, TickOutcome::Idle);
    assert!(!h.reader.is_out_of_sync());

    h.ledger.insert(transfer("1111111111", "2222222222", 9)).await.unwrap();
    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Replayed {
            count: 1,
            cursor: TransactionId::new(4)
        }
    );
    assert_eq!(h.recorder.seen(), vec![4]);
    assert_eq!(h.metrics.export()["reader_regressions"], 1);
}

#[tokio::test]
async fn test_unreachable_store_makes_no_progress() {
    let h = harness();
    h.reader.tick().await;
    h.ledger.insert(transfer("1111111111", "2222222222", 1)).await.unwrap();

    h.ledger.set_available(false);
    assert_eq!(h.reader.tick().await, TickOutcome::StoreUnavailable);
    assert_eq!(h.reader.last_processed_id(), TransactionId::BEFORE_FIRST);
    assert!(!h.reader.is_out_of_sync());

    h.ledger.set_available(true);
    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Replayed {
            count: 1,
            cursor: TransactionId::new(1)
        }
    );
    assert_eq!(h.metrics.export()["reader_store_errors"], 1);
}

#[tokio::test]
async fn test_uninitialized_cursor_retries_instead_of_replaying_everything() {
    let h = harness();
    h.ledger.insert(transfer("1111111111", "2222222222", 1)).await.unwrap();
    h.ledger.set_available(false);
    assert_eq!(h.reader.tick().await, TickOutcome::StoreUnavailable);

    h.ledger.set_available(true);
    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Initialized {
            cursor: TransactionId::new(1)
        }
    );
    assert!(h.recorder.seen().is_empty());
}

#[tokio::test]
async fn test_callback_failure_retries_same_row() {
    let h = harness_with(Some(Arc::new(FailOnce::new([2]))));
    h.reader.tick().await;

    let bob = AccountNumber::from("2222222222");
    h.balances.get_balance(&bob).await.unwrap();
    for amount in [10, 20, 30] {
        h.ledger.insert(transfer("1111111111", "2222222222", amount)).await.unwrap();
    }

    assert_eq!(
        h.reader.tick().await,
        TickOutcome::ReplayAborted {
            replayed: 1,
            cursor: TransactionId::new(1),
            failed_at: TransactionId::new(2)
        }
    );
    assert_eq!(h.reader.last_processed_id(), TransactionId::new(1));
    assert_eq!(h.recorder.seen(), vec![1]);

    assert_eq!(
        h.reader.tick().await,
        TickOutcome::Replayed {
            count: 2,
            cursor: TransactionId::new(3)
        }
    );
    assert_eq!(h.recorder.seen(), vec![1, 2, 3]);
    // Row 2 reached the balance cache on both attempts but counts once
    assert_eq!(h.balances.cached_balance(&bob).await, Some(60));
    assert_eq!(h.metrics.export()["reader_callback_failures"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_keeps_poller_live() {
    let h = harness();
    let health = ScheduledTaskHealth::for_poller(Duration::from_millis(100));
    let handle = h.reader.clone().spawn(Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.ledger.insert(transfer("1111111111", "2222222222", 1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(h.recorder.seen(), vec![1]);
    assert!(health.check_poller(&h.reader).health.status.is_healthy());

    handle.abort();
    tokio::time::sleep(Duration::from_secs(81)).await;
    let report = health.check_poller(&h.reader);
    assert!(!report.health.status.is_healthy());
    assert_eq!(report.last_processed_id, TransactionId::new(1));
}

#[tokio::test]
async fn test_overflowing_credits_abort_tick_without_killing_poller() {
    let h = harness();
    h.reader.tick().await;

    let alice = AccountNumber::from("1111111111");
    h.ledger
        .insert(transfer_between("3333333333", REMOTE, "1111111111", common::LOCAL, i64::MAX))
        .await
        .unwrap();
    assert_eq!(h.balances.get_balance(&alice).await.unwrap(), i64::MAX);
    h.ledger
        .insert(transfer_between("3333333333", REMOTE, "1111111111", common::LOCAL, i64::MAX))
        .await
        .unwrap();

    let reader = h.reader.clone();
    let outcome = tokio::spawn(async move { reader.tick().await }).await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::ReplayAborted {
            replayed: 1,
            cursor: TransactionId::new(1),
            failed_at: TransactionId::new(2)
        }
    );
    assert_eq!(h.balances.cached_balance(&alice).await, Some(i64::MAX));

    // Still ticking, still stuck on the same row
    assert_eq!(
        h.reader.tick().await,
        TickOutcome::ReplayAborted {
            replayed: 0,
            cursor: TransactionId::new(1),
            failed_at: TransactionId::new(2)
        }
    );
    assert_eq!(h.metrics.export()["reader_callback_failures"], 2);
}
