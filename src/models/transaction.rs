//! Transaction log records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    /// An item was created.
    Create,
    /// An item was edited.
    Update,
    /// An item was deleted.
    Delete,
    /// Retail sale.
    Sale,
    /// Wholesale sale.
    WholesaleSale,
}

impl TransactionAction {
    /// Returns the tag written to `transactions.csv`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Sale => "sale",
            Self::WholesaleSale => "wholesale_sale",
        }
    }

    /// Parses an action tag, case-insensitively.
    ///
    /// Returns `None` for unrecognized tags.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" | "created" => Some(Self::Create),
            "update" | "updated" | "edit" => Some(Self::Update),
            "delete" | "deleted" => Some(Self::Delete),
            "sale" | "retail_sale" | "retail" => Some(Self::Sale),
            "wholesale_sale" | "wholesale-sale" | "wholesale" => Some(Self::WholesaleSale),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable log entry describing a mutation applied to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier, reassigned by the importing store.
    pub id: i64,
    /// What happened.
    pub action: TransactionAction,
    /// Owning item, if it still existed when the entry was written.
    pub item_id: Option<i64>,
    /// Item display name, kept so the entry survives item deletion.
    pub item_name: String,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    /// Opaque JSON text owned by the UI layer.
    pub details: String,
}

impl Transaction {
    /// Creates a transaction stamped with the current time.
    #[must_use]
    pub fn new(action: TransactionAction, item_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            action,
            item_id: None,
            item_name: item_name.into(),
            timestamp: crate::current_timestamp(),
            details: String::new(),
        }
    }

    /// Sets the owning item.
    #[must_use]
    pub const fn with_item_id(mut self, item_id: i64) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the details blob.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}
