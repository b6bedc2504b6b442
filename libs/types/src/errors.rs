//! Error types shared across the ledger services
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Failure talking to the ledger store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity loss or timeout; callers report "service unavailable"
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Machine-readable reason a transaction was rejected before reaching the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    MissingField,
    BadFormat,
    NotAuthorized,
    SelfTransfer,
    NonPositiveAmount,
    AmountTooLarge,
}

impl RejectReason {
    /// Stable code surfaced to API callers
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::MissingField => "MISSING_FIELD",
            RejectReason::BadFormat => "BAD_FORMAT",
            RejectReason::NotAuthorized => "NOT_AUTHORIZED",
            RejectReason::SelfTransfer => "SELF_TRANSFER",
            RejectReason::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            RejectReason::AmountTooLarge => "AMOUNT_TOO_LARGE",
        }
    }

    /// Message shown to the end user
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::MissingField => "invalid transaction",
            RejectReason::BadFormat => "invalid account details",
            RejectReason::NotAuthorized => "sender not authorized",
            RejectReason::SelfTransfer => "sender is also receiver",
            RejectReason::NonPositiveAmount | RejectReason::AmountTooLarge => "invalid amount",
        }
    }
}

/// Validation failure carrying the first rule that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid transaction: missing field {field}")]
    MissingField { field: &'static str },

    #[error("Invalid transaction: invalid account details")]
    BadFormat,

    #[error("Invalid transaction: sender not authorized")]
    NotAuthorized,

    #[error("Invalid transaction: sender is also receiver")]
    SelfTransfer,

    #[error("Invalid transaction: transaction amount invalid ({amount})")]
    NonPositiveAmount { amount: i64 },

    #[error("Invalid transaction: amount {amount} exceeds {max}")]
    AmountTooLarge { amount: i64, max: i64 },
}

impl ValidationError {
    pub fn reason(&self) -> RejectReason {
        match self {
            ValidationError::MissingField { .. } => RejectReason::MissingField,
            ValidationError::BadFormat => RejectReason::BadFormat,
            ValidationError::NotAuthorized => RejectReason::NotAuthorized,
            ValidationError::SelfTransfer => RejectReason::SelfTransfer,
            ValidationError::NonPositiveAmount { .. } => RejectReason::NonPositiveAmount,
            ValidationError::AmountTooLarge { .. } => RejectReason::AmountTooLarge,
        }
    }
}
