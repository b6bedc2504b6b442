pub mod balance;
pub mod health;
pub mod history;
pub mod transaction;
