//! Data models for stockpile.
//!
//! Item and transaction records as they flow through export and import.

mod item;
mod transaction;

pub use item::{Item, PRICE_UNKNOWN};
pub use transaction::{Transaction, TransactionAction};
