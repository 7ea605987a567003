//! SQLite-backed inventory store.

use super::{InventoryStore, acquire_lock};
use crate::models::{Item, Transaction, TransactionAction};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Inventory store persisted in a `SQLite` database.
pub struct SqliteStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::failed("create_db_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::failed("open_sqlite", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::failed("open_sqlite_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        // journal_mode returns a row, so it cannot go through execute_batch
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                code TEXT NOT NULL DEFAULT '',
                warehouse TEXT NOT NULL DEFAULT '',
                number_of_boxes INTEGER NOT NULL DEFAULT 0,
                box_size_quantities TEXT NOT NULL DEFAULT '[]',
                size_type TEXT NOT NULL DEFAULT '',
                row TEXT,
                position TEXT,
                side TEXT,
                image_uri TEXT,
                total_quantity INTEGER NOT NULL DEFAULT 0,
                total_value REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                item_id INTEGER,
                item_name TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                details TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_item ON transactions(item_id);",
        )
        .map_err(|e| Error::failed("create_schema", e))
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let box_json: String = row.get(5)?;
    let created_at: String = row.get(13)?;
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        warehouse: row.get(3)?,
        number_of_boxes: row.get(4)?,
        box_size_quantities: serde_json::from_str(&box_json)
            .unwrap_or_else(|_| serde_json::Value::Array(Vec::new())),
        size_type: row.get(6)?,
        row: row.get(7)?,
        position: row.get(8)?,
        side: row.get(9)?,
        image_uri: row.get(10)?,
        total_quantity: row.get(11)?,
        total_value: row.get(12)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_or_else(|_| Utc::now(), |d| d.with_timezone(&Utc)),
    })
}

impl InventoryStore for SqliteStore {
    fn items(&self) -> Result<Vec<Item>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT id, name, code, warehouse, number_of_boxes, box_size_quantities,
                        size_type, row, position, side, image_uri, total_quantity,
                        total_value, created_at
                 FROM items ORDER BY id",
            )
            .map_err(|e| Error::failed("prepare_items", e))?;

        let items = stmt
            .query_map([], item_from_row)
            .map_err(|e| Error::failed("query_items", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::failed("read_items", e))?;
        Ok(items)
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT id, action, item_id, item_name, timestamp, details
                 FROM transactions ORDER BY id",
            )
            .map_err(|e| Error::failed("prepare_transactions", e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| Error::failed("query_transactions", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::failed("read_transactions", e))?;

        let mut transactions = Vec::with_capacity(rows.len());
        for (id, action, item_id, item_name, timestamp, details) in rows {
            let Some(action) = TransactionAction::parse(&action) else {
                tracing::warn!(id, action = %action, "Skipping transaction with unknown action");
                continue;
            };
            transactions.push(Transaction {
                id,
                action,
                item_id,
                item_name,
                timestamp,
                details,
            });
        }
        Ok(transactions)
    }

    fn insert_item_import(&self, item: &Item) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO items (name, code, warehouse, number_of_boxes, box_size_quantities,
                                size_type, row, position, side, image_uri, total_quantity,
                                total_value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                item.name,
                item.code,
                item.warehouse,
                item.number_of_boxes,
                item.box_size_quantities.to_string(),
                item.size_type,
                item.row,
                item.position,
                item.side,
                item.image_uri,
                item.total_quantity,
                item.total_value,
                item.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::failed("insert_item", e))?;
        Ok(())
    }

    fn insert_transaction_import(&self, transaction: &Transaction) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO transactions (action, item_id, item_name, timestamp, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                transaction.action.as_str(),
                transaction.item_id,
                transaction.item_name,
                transaction.timestamp,
                transaction.details,
            ],
        )
        .map_err(|e| Error::failed("insert_transaction", e))?;
        Ok(())
    }

    fn item_count(&self) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .map_err(|e| Error::failed("count_items", e))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
