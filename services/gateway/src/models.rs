use ledger_reader::{Health, PollerReport};
use serde::Serialize;
use types::ids::TransactionId;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: &'static str,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub task_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_since_last_run_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_processed_id: TransactionId,
    pub out_of_sync: bool,
}

impl From<PollerReport> for HealthResponse {
    fn from(report: PollerReport) -> Self {
        let (status, error) = match report.health.status {
            Health::Healthy => ("UP", None),
            Health::Unhealthy(reason) => ("DOWN", Some(reason)),
        };
        Self {
            status,
            task_name: report.health.task_name,
            time_since_last_run_ms: report.health.time_since_last_run.map(|d| d.as_millis() as u64),
            error,
            last_processed_id: report.last_processed_id,
            out_of_sync: report.out_of_sync,
        }
    }
}
