//! In-memory inventory store.

use super::{InventoryStore, acquire_lock};
use crate::Result;
use crate::models::{Item, Transaction};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    items: Vec<Item>,
    transactions: Vec<Transaction>,
    next_item_id: i64,
    next_transaction_id: i64,
}

/// Inventory store held entirely in memory.
///
/// Ids are assigned from per-table sequences starting at 1, so importing into
/// a fresh store renumbers records the same way a new device would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with records, keeping their ids as given.
    #[must_use]
    pub fn with_records(items: Vec<Item>, transactions: Vec<Transaction>) -> Self {
        let next_item_id = items.iter().map(|i| i.id).max().unwrap_or(0);
        let next_transaction_id = transactions.iter().map(|t| t.id).max().unwrap_or(0);
        Self {
            tables: Mutex::new(Tables {
                items,
                transactions,
                next_item_id,
                next_transaction_id,
            }),
        }
    }

    /// Returns the number of transactions.
    pub fn transaction_count(&self) -> usize {
        acquire_lock(&self.tables).transactions.len()
    }
}

impl InventoryStore for MemoryStore {
    fn items(&self) -> Result<Vec<Item>> {
        let mut items = acquire_lock(&self.tables).items.clone();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let mut transactions = acquire_lock(&self.tables).transactions.clone();
        transactions.sort_by_key(|t| t.id);
        Ok(transactions)
    }

    fn insert_item_import(&self, item: &Item) -> Result<()> {
        let mut tables = acquire_lock(&self.tables);
        tables.next_item_id += 1;
        let mut stored = item.clone();
        stored.id = tables.next_item_id;
        tables.items.push(stored);
        Ok(())
    }

    fn insert_transaction_import(&self, transaction: &Transaction) -> Result<()> {
        let mut tables = acquire_lock(&self.tables);
        tables.next_transaction_id += 1;
        let mut stored = transaction.clone();
        stored.id = tables.next_transaction_id;
        tables.transactions.push(stored);
        Ok(())
    }

    fn item_count(&self) -> Result<usize> {
        Ok(acquire_lock(&self.tables).items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionAction;

    #[test]
    fn test_insert_reassigns_ids() {
        let store = MemoryStore::new();
        store
            .insert_item_import(&Item::new("a").with_id(40))
            .unwrap();
        store
            .insert_item_import(&Item::new("b").with_id(41))
            .unwrap();

        let ids: Vec<i64> = store.items().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_seeded_store_continues_sequence() {
        let store = MemoryStore::with_records(
            vec![Item::new("a").with_id(5)],
            vec![Transaction::new(TransactionAction::Create, "a").with_item_id(5)],
        );
        store.insert_item_import(&Item::new("b")).unwrap();
        let items = store.items().unwrap();
        assert_eq!(items.last().map(|i| i.id), Some(6));
        assert_eq!(store.transaction_count(), 1);
    }
}
