//! # Stockpile
//!
//! Bounded-memory bulk data interchange for a warehouse inventory store.
//!
//! Stockpile exports the whole local dataset (items, transactions, item
//! images) to a portable archive and imports such an archive back, keeping
//! peak memory proportional to a batch rather than to the dataset.
//!
//! ## Features
//!
//! - Staged export: batched CSV writes, OS-level image copies, then packaging
//! - Size-gated archive import with a folder-based constant-memory path
//! - Heuristic re-association of images with items whose ids changed
//! - Row-level failure tolerance with an advisory summary for the user
//! - Cooperative cancellation at every batch boundary
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockpile::io::{ExportOptions, ExportService};
//! use stockpile::storage::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let service = ExportService::new(store, config.clone());
//! let result = service.export(&ExportOptions::default(), None)?;
//! println!("Archive written to {}", result.path.display());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod storage;

pub use config::{StockpileConfig, TransferSettings};
pub use models::{Item, Transaction, TransactionAction};
pub use storage::{ImageStore, InventoryStore, MemoryStore, SqliteStore};

/// Instruction appended to errors raised when an archive cannot be decoded in memory.
pub const MANUAL_EXTRACTION_HINT: &str = "extract the archive manually with any ZIP tool \
     and import the extracted folder instead";

/// Error type for stockpile operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed arguments, unknown layout names, bad config values |
/// | `OperationFailed` | Filesystem, archive, or database operations fail |
/// | `MissingInput` | A required file such as `items.csv` is absent |
/// | `ArchiveTooLarge` | The size probe classifies an archive as risky |
/// | `OutOfMemory` | An allocation is refused while decoding an archive |
/// | `Cancelled` | The cancellation token was observed at a yield point |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Staging or output directories cannot be created
    /// - CSV, image, or archive I/O fails
    /// - The `SQLite` store rejects a statement
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A required input file does not exist.
    #[error("required file not found: {}", path.display())]
    MissingInput {
        /// The path that was expected.
        path: PathBuf,
    },

    /// The archive is above the in-memory extraction limit.
    #[error(
        "archive is {size} bytes, above the {limit} byte in-memory limit; {}",
        MANUAL_EXTRACTION_HINT
    )]
    ArchiveTooLarge {
        /// Archive size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// Memory could not be reserved while decoding an archive.
    #[error("out of memory while {context}; {}", MANUAL_EXTRACTION_HINT)]
    OutOfMemory {
        /// What was being decoded.
        context: String,
    },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn failed(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for errors that tell the user to fall back to folder import.
    #[must_use]
    pub const fn needs_manual_extraction(&self) -> bool {
        matches!(self, Self::ArchiveTooLarge { .. } | Self::OutOfMemory { .. })
    }
}

/// Result type alias for stockpile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::failed("copy_image", "disk full");
        assert_eq!(err.to_string(), "operation 'copy_image' failed: disk full");

        let err = Error::MissingInput {
            path: PathBuf::from("/tmp/x/items.csv"),
        };
        assert!(err.to_string().contains("items.csv"));
    }

    #[test]
    fn test_manual_extraction_errors() {
        let err = Error::ArchiveTooLarge {
            size: 80,
            limit: 50,
        };
        assert!(err.needs_manual_extraction());
        assert!(err.to_string().contains("extract the archive manually"));

        let err = Error::OutOfMemory {
            context: "reading archive".to_string(),
        };
        assert!(err.needs_manual_extraction());
        assert!(err.to_string().contains("import the extracted folder"));

        assert!(!Error::Cancelled.needs_manual_extraction());
    }

    #[test]
    fn test_current_timestamp_is_positive() {
        assert!(current_timestamp() > 0);
    }
}
