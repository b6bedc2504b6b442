use crate::models::HealthResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use std::collections::BTreeMap;

/// Poller liveness. 503 once the poller has missed its schedule.
pub async fn healthy(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.poller_health.check_poller(&state.reader);
    let status = if report.health.status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report.into()))
}

pub async fn ready() -> &'static str {
    "ok"
}

pub async fn version(State(state): State<AppState>) -> String {
    state.config.version.clone()
}

pub async fn metrics(State(state): State<AppState>) -> Json<BTreeMap<String, i64>> {
    Json(state.export_metrics())
}
