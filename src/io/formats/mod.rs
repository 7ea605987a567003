//! Tabular interchange files.
//!
//! An export is a directory (optionally zipped) with this layout:
//!
//! ```text
//! items.csv
//! transactions.csv
//! images/<id>_<basename>
//! ```

pub mod records;
pub mod table;
pub mod tabular;

pub use records::{DecodedItem, ITEM_COLUMNS, RowError, TRANSACTION_COLUMNS};
pub use table::{TableReader, TableWriter, count_rows};
pub use tabular::{escape_field, parse_table, render_row};

/// Item table file name.
pub const ITEMS_FILE: &str = "items.csv";

/// Transaction table file name.
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

/// Image folder name.
pub const IMAGES_DIR: &str = "images";

/// Extension of table entries, which are decoded as text during extraction.
pub const TABLE_EXTENSION: &str = "csv";
