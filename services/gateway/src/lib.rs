//! Ledger Gateway
//!
//! Single-process HTTP surface over the ledger reader and writer:
//! - `GET /balances/{account}` and `GET /transactions/{account}` from the caches
//! - `POST /transactions` through the writer
//! - `GET /healthy`, `/ready`, `/version`, `/metrics`

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
