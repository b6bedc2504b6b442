use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::SubmitResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use ledger_writer::Caller;
use types::transaction::TransactionRequest;

pub async fn submit_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let caller = Caller {
        account: user.account,
        bearer_token: user.token,
    };
    let transaction = state.writer.submit(&caller, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            status: "ok",
            transaction_id: transaction.transaction_id,
        }),
    ))
}
