//! Ledger Reader
//!
//! Tails the append-only ledger and keeps per-account caches current:
//! - Cursor/poller that discovers new rows and replays them in id order
//! - Replay callbacks, fanned out to every cache
//! - Balance and history caches, lazily loaded with one load per key in flight
//! - Liveness check for the poller
//!
//! # Architecture
//!
//! ```text
//!   Ledger store
//!        │  max id / rows after cursor
//!   ┌────▼────┐
//!   │ Poller  │  ← fixed delay, one tick at a time
//!   └────┬────┘
//!        │  replay, ascending id
//!   ┌────▼────┐
//!   │ FanOut  │
//!   └─┬─────┬─┘
//!     │     │
//! ┌───▼───┐ ┌▼───────┐
//! │Balance│ │History │  ← HTTP readers lazy-load on miss
//! └───────┘ └────────┘
//! ```

pub mod balance;
pub mod callback;
pub mod health;
pub mod history;
pub mod loading_cache;
pub mod metrics;
pub mod poller;

pub use balance::BalanceCache;
pub use callback::{FanOut, ReplayCallback, ReplayError};
pub use health::{Health, HealthReport, PollerReport, ScheduledTaskHealth};
pub use history::{HistoryCache, HistoryConfig};
pub use loading_cache::{CacheConfig, CacheError, CacheStats, LoadingCache};
pub use metrics::ReaderMetrics;
pub use poller::{Cursor, LedgerReader, TickOutcome};
