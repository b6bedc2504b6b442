use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use types::ids::AccountNumber;
use types::transaction::Transaction;

/// Most recent transactions of the caller's account, newest first
pub async fn get_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(account_id): Path<String>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    if user.account.as_str() != account_id {
        return Err(AppError::Unauthorized("Cannot view another account".into()));
    }

    if let Some(latency) = state.config.extra_latency {
        tokio::time::sleep(latency).await;
    }

    // Refresh first so the response reflects rows the poller has not replayed yet
    let account = AccountNumber::new(account_id);
    state.history.refresh(&account).await?;
    let history = state.history.get_history(&account).await?;
    Ok(Json(history))
}
