//! Ledger Writer
//!
//! Accepts one transaction at a time onto the ledger:
//! - Validation of the submitted request
//! - Duplicate-submission guard keyed by idempotency token
//! - Available-balance check for local senders
//! - Append to the ledger store

pub mod balance_client;
pub mod dedup;
pub mod metrics;
pub mod validator;
pub mod writer;

pub use balance_client::{BalanceLookupError, BalanceSource, HttpBalanceClient};
pub use dedup::{DuplicateError, DuplicateGuard, Reservation};
pub use validator::{validate, MAX_AMOUNT};
pub use writer::{Caller, LedgerWriter, SubmitError};
