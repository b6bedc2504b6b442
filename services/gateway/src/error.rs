use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger_reader::CacheError;
use ledger_writer::{BalanceLookupError, SubmitError};
use serde_json::json;
use thiserror::Error;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transaction refused; `code` is machine-readable
    #[error("Rejected ({code}): {message}")]
    Rejected { code: &'static str, message: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Unauthorized(msg) => {
                tracing::debug!(reason = %msg, "Authentication failed");
                (StatusCode::UNAUTHORIZED, "not authorized".to_string(), "UNAUTHORIZED")
            }
            AppError::Rejected { code, message } => (StatusCode::BAD_REQUEST, message, code),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, "SERVICE_UNAVAILABLE"),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": code,
            "message": error_message
        }));

        (status, body).into_response()
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        tracing::error!(error = %err, "Cache lookup failed");
        match err {
            CacheError::StoreUnavailable(_) => AppError::ServiceUnavailable("unable to load data into cache".into()),
            CacheError::Load(_) => AppError::Internal("cache error".into()),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Duplicate(_) => AppError::Rejected {
                code: "DUPLICATE",
                message: "unable to add duplicate transaction".into(),
            },
            SubmitError::Invalid(invalid) => {
                let reason = invalid.reason();
                AppError::Rejected {
                    code: reason.code(),
                    message: reason.message().into(),
                }
            }
            SubmitError::InsufficientBalance { .. } => AppError::Rejected {
                code: "INSUFFICIENT_BALANCE",
                message: "insufficient balance".into(),
            },
            SubmitError::BalanceUnavailable(BalanceLookupError::Unavailable(_)) => {
                AppError::ServiceUnavailable("remote resource unavailable".into())
            }
            SubmitError::BalanceUnavailable(BalanceLookupError::Failed(_)) => {
                AppError::Internal("unable to read available balance".into())
            }
            SubmitError::Store(store) if store.is_unavailable() => {
                AppError::ServiceUnavailable("unable to persist transaction".into())
            }
            SubmitError::Store(_) => AppError::Internal("unable to persist transaction".into()),
        }
    }
}
