//! Inventory store trait.

use crate::Result;
use crate::models::{Item, Transaction};

/// The persistence operations the export and import pipelines rely on.
///
/// Inserts are transactional per record: a failed insert leaves no partial
/// row behind, so the import loop can log it and move on.
pub trait InventoryStore: Send + Sync {
    /// Returns every item, ordered by id.
    fn items(&self) -> Result<Vec<Item>>;

    /// Returns every transaction, ordered by id.
    fn all_transactions(&self) -> Result<Vec<Transaction>>;

    /// Inserts an imported item. The store assigns a fresh id.
    fn insert_item_import(&self, item: &Item) -> Result<()>;

    /// Inserts an imported transaction. The store assigns a fresh id.
    fn insert_transaction_import(&self, transaction: &Transaction) -> Result<()>;

    /// Returns the number of items.
    fn item_count(&self) -> Result<usize> {
        Ok(self.items()?.len())
    }
}
