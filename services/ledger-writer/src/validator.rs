//! Transaction validation
//!
//! Checks a submitted request before it can reach the ledger.
//!
//! Checks performed (in order, first failure wins):
//! 1. All five core fields present
//! 2. Account numbers are 10 digits, routing numbers 9 digits
//! 3. A local sender is the authenticated account
//! 4. Sender and receiver differ
//! 5. Amount is strictly positive and at most `MAX_AMOUNT`

use tracing::debug;
use types::errors::ValidationError;
use types::ids::{AccountNumber, RoutingNumber};
use types::transaction::{NewTransaction, TransactionRequest};

/// Largest amount accepted in one transaction, in cents (the ledger's 32-bit amount column)
pub const MAX_AMOUNT: i64 = i32::MAX as i64;

fn required<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, ValidationError> {
    value.as_ref().ok_or(ValidationError::MissingField { field })
}

/// Validate `request` on behalf of `authed_account`.
pub fn validate(
    local_routing: &RoutingNumber,
    authed_account: &AccountNumber,
    request: &TransactionRequest,
) -> Result<NewTransaction, ValidationError> {
    debug!("Validating transaction");

    // 1. Presence
    let from_account = AccountNumber::new(required(&request.from_account_num, "fromAccountNum")?.as_str());
    let from_routing = RoutingNumber::new(required(&request.from_routing_num, "fromRoutingNum")?.as_str());
    let to_account = AccountNumber::new(required(&request.to_account_num, "toAccountNum")?.as_str());
    let to_routing = RoutingNumber::new(required(&request.to_routing_num, "toRoutingNum")?.as_str());
    let amount = *required(&request.amount, "amount")?;

    // 2. Format
    if !from_account.is_well_formed()
        || !to_account.is_well_formed()
        || !from_routing.is_well_formed()
        || !to_routing.is_well_formed()
    {
        return Err(ValidationError::BadFormat);
    }

    // 3. Only the owner may debit a local account
    if &from_routing == local_routing && &from_account != authed_account {
        return Err(ValidationError::NotAuthorized);
    }

    // 4. No transfers to self
    if from_account == to_account && from_routing == to_routing {
        return Err(ValidationError::SelfTransfer);
    }

    // 5. Amount
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount { amount });
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge {
            amount,
            max: MAX_AMOUNT,
        });
    }

    Ok(NewTransaction {
        from_account,
        from_routing,
        to_account,
        to_routing,
        amount,
        idempotency_token: request.token().map(str::to_string),
    })
}
