//! Transaction types
//!
//! A transaction moves `amount` minor currency units from one
//! (account, routing number) pair to another. It goes through three shapes:
//!
//! - [`TransactionRequest`]: what a client submits, every field optional
//! - [`NewTransaction`]: a request that passed validation, ready to insert
//! - [`Transaction`]: a persisted ledger row with its store-assigned id
//!
//! Persisted transactions are immutable.

use crate::ids::{AccountNumber, RoutingNumber, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minor units per major currency unit (cents per dollar)
const MINOR_UNIT_SCALE: u32 = 2;

/// Transaction as submitted by a client
///
/// Field names follow the public wire contract. The idempotency token is
/// carried under `uuid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from_account_num: Option<String>,
    pub from_routing_num: Option<String>,
    pub to_account_num: Option<String>,
    pub to_routing_num: Option<String>,
    pub amount: Option<i64>,
    #[serde(rename = "uuid", default, skip_serializing_if = "Option::is_none")]
    pub idempotency_token: Option<String>,
}

impl TransactionRequest {
    /// The idempotency token, if the client sent a non-empty one
    pub fn token(&self) -> Option<&str> {
        self.idempotency_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A validated transaction, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub from_account: AccountNumber,
    pub from_routing: RoutingNumber,
    pub to_account: AccountNumber,
    pub to_routing: RoutingNumber,
    pub amount: i64,
    pub idempotency_token: Option<String>,
}

/// A persisted ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: TransactionId,
    #[serde(rename = "fromAccountNum")]
    pub from_account: AccountNumber,
    #[serde(rename = "fromRoutingNum")]
    pub from_routing: RoutingNumber,
    #[serde(rename = "toAccountNum")]
    pub to_account: AccountNumber,
    #[serde(rename = "toRoutingNum")]
    pub to_routing: RoutingNumber,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "uuid", default, skip_serializing_if = "Option::is_none")]
    pub idempotency_token: Option<String>,
}

impl Transaction {
    /// Build the persisted row for `new` with the id the store assigned
    pub fn persisted(id: TransactionId, new: NewTransaction, timestamp: DateTime<Utc>) -> Self {
        Self {
            transaction_id: id,
            from_account: new.from_account,
            from_routing: new.from_routing,
            to_account: new.to_account,
            to_routing: new.to_routing,
            amount: new.amount,
            timestamp,
            idempotency_token: new.idempotency_token,
        }
    }

    /// Whether `account` at `routing` is the sender
    pub fn is_debit_for(&self, account: &AccountNumber, routing: &RoutingNumber) -> bool {
        &self.from_account == account && &self.from_routing == routing
    }

    /// Whether `account` at `routing` is the receiver
    pub fn is_credit_for(&self, account: &AccountNumber, routing: &RoutingNumber) -> bool {
        &self.to_account == account && &self.to_routing == routing
    }

    /// Signed effect of this transaction on `account` at `routing`
    pub fn delta_for(&self, account: &AccountNumber, routing: &RoutingNumber) -> i64 {
        let mut delta = 0;
        if self.is_credit_for(account, routing) {
            delta += self.amount;
        }
        if self.is_debit_for(account, routing) {
            delta -= self.amount;
        }
        delta
    }

    /// Amount as a currency value with two decimal places
    pub fn currency_amount(&self) -> Decimal {
        Decimal::new(self.amount, MINOR_UNIT_SCALE)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(id={}, requestUUID={}, fromRoutingNumber={}, toRoutingNumber={}) {}->${:.2}->{}",
            self.transaction_id,
            self.idempotency_token.as_deref().unwrap_or(""),
            self.from_routing,
            self.to_routing,
            self.from_account,
            self.currency_amount(),
            self.to_account,
        )
    }
}
