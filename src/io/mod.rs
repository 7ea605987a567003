//! Bulk import/export subsystem.
//!
//! Moves the whole inventory in and out of a portable bundle while keeping
//! memory use proportional to a batch.
//!
//! # Architecture
//!
//! - **Formats**: the CSV codec, batched table files, and row mapping
//! - **Images**: OS-level image copies on export, name matching on import
//! - **Archive**: ZIP packaging and size-gated extraction
//! - **Services**: the export and import orchestrators
//!
//! Both orchestrators report [`Progress`] through an optional callback and
//! stop at the next batch boundary once their [`CancellationToken`] is set.
//!
//! # Bundle layout
//!
//! | Entry | Contents |
//! |-------|----------|
//! | `items.csv` | One row per item, header first |
//! | `transactions.csv` | One row per transaction, header first |
//! | `images/<id>_<basename>` | Item images, named after the exporting item id |
//!
//! # Examples
//!
//! ```rust,ignore
//! use stockpile::io::{ImportOptions, ImportService};
//!
//! let service = ImportService::new(store, &config);
//! let result = service.import_from_path(path, &ImportOptions::default(), None)?;
//! println!("{}", result.summary());
//! ```

pub mod archive;
pub mod formats;
pub mod images;
pub mod pacing;
pub mod progress;
pub mod services;
pub mod staging;

pub use archive::{ArchiveRisk, classify_archive_size, probe_archive};
pub use pacing::{CancellationToken, Pacer};
pub use progress::{Progress, ProgressCallback, ProgressReporter, Stage};
pub use services::{
    ExportLayout, ExportOptions, ExportResult, ExportService, ImportOptions, ImportResult,
    ImportService,
};
