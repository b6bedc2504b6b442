//! Types library for the bank ledger services
//!
//! This library provides the data model shared by the ledger reader, the
//! ledger writer and the gateway, so every service agrees on the wire
//! format and on the error taxonomy.
//!
//! # Modules
//! - `ids`: Identifiers (TransactionId, AccountNumber, RoutingNumber)
//! - `transaction`: Submitted, validated and persisted transaction shapes
//! - `errors`: Error taxonomy

pub mod ids;
pub mod transaction;
pub mod errors;
