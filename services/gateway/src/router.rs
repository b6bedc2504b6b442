use crate::handlers::{balance, health, history, transaction};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/balances/{account}", get(balance::get_balance))
        .route("/transactions/{account}", get(history::get_history))
        .route("/transactions", post(transaction::submit_transaction));

    let ops_routes = Router::new()
        .route("/healthy", get(health::healthy))
        .route("/ready", get(health::ready))
        .route("/version", get(health::version))
        .route("/metrics", get(health::metrics));

    Router::new()
        .merge(api_routes)
        .merge(ops_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
