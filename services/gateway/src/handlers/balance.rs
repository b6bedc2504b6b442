use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use types::ids::AccountNumber;

pub async fn get_balance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(account_id): Path<String>,
) -> Result<Json<i64>, AppError> {
    // Identity validation
    if user.account.as_str() != account_id {
        return Err(AppError::Unauthorized("Cannot view another account".into()));
    }

    let balance = state.balances.get_balance(&AccountNumber::new(account_id)).await?;
    Ok(Json(balance))
}
