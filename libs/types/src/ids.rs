//! Identifier types for ledger entities
//!
//! Transaction ids are assigned by the ledger store at insert time and are
//! strictly increasing, which is what the ledger reader's cursor relies on.
//! Account and routing numbers are opaque strings; their format is only
//! checked on the write path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a persisted ledger row
///
/// Ordering follows insertion order in the ledger. `BEFORE_FIRST` is the
/// cursor position that precedes every real row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Cursor sentinel used when the ledger is empty
    pub const BEFORE_FIRST: TransactionId = TransactionId(-1);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TransactionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Bank account number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Number of digits in a well-formed account number
    pub const LEN: usize = 10;

    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is exactly `LEN` ASCII digits
    pub fn is_well_formed(&self) -> bool {
        all_digits(&self.0, Self::LEN)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Bank routing number
///
/// Transactions whose routing number equals the deployment's local routing
/// number affect accounts held by this bank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingNumber(String);

impl RoutingNumber {
    /// Number of digits in a well-formed routing number
    pub const LEN: usize = 9;

    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        all_digits(&self.0, Self::LEN)
    }
}

impl fmt::Display for RoutingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoutingNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_ordering() {
        assert!(TransactionId::BEFORE_FIRST < TransactionId::new(0));
        assert!(TransactionId::new(1) < TransactionId::new(2));
    }

    #[test]
    fn test_transaction_id_serialization() {
        let id = TransactionId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let deserialized: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_account_number_format() {
        assert!(AccountNumber::from("1234567890").is_well_formed());
        assert!(!AccountNumber::from("123456789").is_well_formed());
        assert!(!AccountNumber::from("12345678901").is_well_formed());
        assert!(!AccountNumber::from("12345abcde").is_well_formed());
        assert!(!AccountNumber::from("").is_well_formed());
    }

    #[test]
    fn test_routing_number_format() {
        assert!(RoutingNumber::from("883745000").is_well_formed());
        assert!(!RoutingNumber::from("1234567890").is_well_formed());
        assert!(!RoutingNumber::from("88374500x").is_well_formed());
    }

    #[test]
    fn test_non_ascii_digits_rejected() {
        // Arabic-Indic digits are numeric but not ASCII
        assert!(!AccountNumber::from("١٢٣٤٥٦٧٨٩٠").is_well_formed());
    }
}
