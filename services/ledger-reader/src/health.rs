//! Liveness of scheduled tasks
//!
//! A task is healthy while the time since its last recorded start stays
//! within `expected runtime + expected interval + acceptable variance`.

use std::time::Duration;

use tokio::time::Instant;
use types::ids::TransactionId;

use crate::poller::LedgerReader;

pub const POLLER_TASK_NAME: &str = "ledger-reader";
pub const POLLER_EXPECTED_RUNTIME: Duration = Duration::from_secs(50);
pub const POLLER_ACCEPTABLE_VARIANCE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy(String),
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub task_name: String,
    pub status: Health,
    pub time_since_last_run: Option<Duration>,
}

/// Poller liveness plus its cursor state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerReport {
    pub health: HealthReport,
    pub last_processed_id: TransactionId,
    pub out_of_sync: bool,
}

#[derive(Debug, Clone)]
pub struct ScheduledTaskHealth {
    task_name: String,
    max_interval: Duration,
}

impl ScheduledTaskHealth {
    pub fn new(
        task_name: impl Into<String>,
        expected_runtime: Duration,
        acceptable_variance: Duration,
        expected_interval: Duration,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            max_interval: expected_runtime + expected_interval + acceptable_variance,
        }
    }

    /// Thresholds for the ledger poller running every `poll_interval`
    pub fn for_poller(poll_interval: Duration) -> Self {
        Self::new(
            POLLER_TASK_NAME,
            POLLER_EXPECTED_RUNTIME,
            POLLER_ACCEPTABLE_VARIANCE,
            poll_interval,
        )
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn check(&self, last_run: Option<Instant>, now: Instant) -> HealthReport {
        let Some(last_run) = last_run else {
            return HealthReport {
                task_name: self.task_name.clone(),
                status: Health::Unhealthy("unable to get last run time".to_string()),
                time_since_last_run: None,
            };
        };

        let since = now.saturating_duration_since(last_run);
        let status = if since > self.max_interval {
            Health::Unhealthy(format!("{} is not running with the expected schedule", self.task_name))
        } else {
            Health::Healthy
        };
        HealthReport {
            task_name: self.task_name.clone(),
            status,
            time_since_last_run: Some(since),
        }
    }

    pub fn check_poller(&self, reader: &LedgerReader) -> PollerReport {
        PollerReport {
            health: self.check(reader.last_run(), Instant::now()),
            last_processed_id: reader.last_processed_id(),
            out_of_sync: reader.is_out_of_sync(),
        }
    }
}
