//! Inventory export service.
//!
//! An export runs in four steps:
//!
//! 1. Items and transactions are loaded from the store.
//! 2. Both tables are written into a staging directory in batches.
//! 3. Item images are copied next to them under `images/`.
//! 4. The staging directory is packaged into a ZIP archive and removed.
//!
//! With [`ExportLayout::Folder`] step 4 is skipped and the staged folder is
//! the result. It imports with constant memory, which makes it the layout of
//! choice for datasets whose images would not fit an in-memory archive.

use crate::config::StockpileConfig;
use crate::io::archive::ArchivePackager;
use crate::io::formats::records::{item_to_fields, transaction_to_fields};
use crate::io::formats::{
    IMAGES_DIR, ITEM_COLUMNS, ITEMS_FILE, TRANSACTION_COLUMNS, TRANSACTIONS_FILE, TableWriter,
};
use crate::io::images::{MaterializeReport, materialize_images, measure_image_payload};
use crate::io::pacing::{CancellationToken, Pacer};
use crate::io::progress::{ProgressCallback, ProgressReporter, Stage};
use crate::io::staging::StagingDir;
use crate::models::{Item, Transaction};
use crate::storage::InventoryStore;
use crate::{Error, Result};
use chrono::Utc;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Shape of the export output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportLayout {
    /// A single ZIP archive.
    #[default]
    Archive,
    /// A plain directory with the archive's layout.
    Folder,
    /// Folder when the image payload exceeds the in-memory archive limit,
    /// archive otherwise.
    Auto,
}

impl ExportLayout {
    /// Returns the layout as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Folder => "folder",
            Self::Auto => "auto",
        }
    }

    /// Parses a layout name (case-insensitive). `zip` and `dir` are accepted aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "archive" | "zip" => Some(Self::Archive),
            "folder" | "dir" | "directory" => Some(Self::Folder),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExportLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unknown export layout: {s}. Expected one of: archive, folder, auto"
            ))
        })
    }
}

/// Options for an export.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output shape.
    pub layout: ExportLayout,
    /// Destination directory; defaults to the configured export directory.
    pub output_dir: Option<PathBuf>,
    /// Token observed at every yield point.
    pub cancellation: CancellationToken,
}

impl ExportOptions {
    /// Sets the layout.
    #[must_use]
    pub const fn with_layout(mut self, layout: ExportLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the destination directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Archive file or export folder.
    pub path: PathBuf,
    /// Layout actually produced (never `Auto`).
    pub layout: ExportLayout,
    /// Item rows written.
    pub items: usize,
    /// Transaction rows written.
    pub transactions: usize,
    /// Images copied into the export.
    pub images_copied: usize,
    /// Images that could not be copied.
    pub images_failed: usize,
    /// Archive size, for the archive layout.
    pub archive_bytes: Option<u64>,
}

impl ExportResult {
    /// Returns a one-paragraph summary for the user.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Exported {} items, {} transactions, and {} images to {}.",
            self.items,
            self.transactions,
            self.images_copied,
            self.path.display()
        );
        if self.images_failed > 0 {
            summary.push_str(&format!(
                " {} images could not be copied and were left out.",
                self.images_failed
            ));
        }
        summary
    }
}

/// Service exporting the whole inventory.
pub struct ExportService {
    store: Arc<dyn InventoryStore>,
    config: StockpileConfig,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(store: Arc<dyn InventoryStore>, config: StockpileConfig) -> Self {
        Self { store, config }
    }

    /// Exports every item, transaction, and image.
    ///
    /// Progress runs from `preparing` at 0% through item, transaction,
    /// image, and packaging stages to `complete` at 100%. On failure or
    /// cancellation the staging directory is removed and no output is left
    /// behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, a staging or output
    /// path cannot be written, packaging fails, or the export is cancelled.
    #[instrument(skip_all, fields(operation = "export", layout = %options.layout))]
    pub fn export(
        &self,
        options: &ExportOptions,
        progress: Option<&ProgressCallback<'_>>,
    ) -> Result<ExportResult> {
        let start = Instant::now();
        let result = self.run(options, &ProgressReporter::new(progress));

        let status = match &result {
            Ok(export) => {
                tracing::info!(
                    path = %export.path.display(),
                    items = export.items,
                    transactions = export.transactions,
                    images = export.images_copied,
                    "Export complete"
                );
                "success"
            },
            Err(Error::Cancelled) => {
                tracing::info!("Export cancelled");
                "cancelled"
            },
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                "error"
            },
        };
        metrics::counter!("stockpile_exports_total", "status" => status).increment(1);
        metrics::histogram!("stockpile_export_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }

    fn run(&self, options: &ExportOptions, reporter: &ProgressReporter<'_>) -> Result<ExportResult> {
        let transfer = &self.config.transfer;
        let pacer = Pacer::new(transfer.batch_pause, options.cancellation.clone());
        reporter.report(Stage::Preparing, 0, 1, "Preparing export");

        let items = self.store.items()?;
        let transactions = self.store.all_transactions()?;
        let layout = self.resolve_layout(options.layout, &items);

        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.export_dir.clone());
        fs::create_dir_all(&output_dir).map_err(|e| {
            Error::failed("create_export_dir", format!("{}: {e}", output_dir.display()))
        })?;
        pacer.token().check()?;

        let mut export = ExportResult {
            path: PathBuf::new(),
            layout,
            items: items.len(),
            transactions: transactions.len(),
            images_copied: 0,
            images_failed: 0,
            archive_bytes: None,
        };

        let images = if layout == ExportLayout::Folder {
            let folder = StagingDir::create(&output_dir, "stockpile_export")?;
            let images = self.stage(folder.path(), &items, &transactions, reporter, &pacer, 99)?;
            export.path = folder.keep();
            images
        } else {
            let staging = StagingDir::create(&self.config.staging_root, "export")?;
            let images = self.stage(staging.path(), &items, &transactions, reporter, &pacer, 90)?;
            let archive = ArchivePackager::new(transfer.compression_level, transfer.image_yield_interval)
                .package(
                    staging.path(),
                    &archive_path(&output_dir),
                    &reporter.band(90, 99),
                    &pacer,
                )?;
            staging.cleanup();
            export.path = archive.path;
            export.archive_bytes = Some(archive.bytes);
            images
        };

        export.images_copied = images.copied;
        export.images_failed = images.failed;
        reporter.complete(export.summary());
        Ok(export)
    }

    fn resolve_layout(&self, requested: ExportLayout, items: &[Item]) -> ExportLayout {
        if requested != ExportLayout::Auto {
            return requested;
        }
        let payload = measure_image_payload(items);
        let limit = self.config.transfer.archive_memory_limit;
        let layout = if payload > limit {
            ExportLayout::Folder
        } else {
            ExportLayout::Archive
        };
        tracing::info!(payload, limit, layout = %layout, "Resolved automatic export layout");
        layout
    }

    /// Writes both tables and copies images into `dir`. Images take the
    /// progress band from 60% to `images_end`.
    fn stage(
        &self,
        dir: &Path,
        items: &[Item],
        transactions: &[Transaction],
        reporter: &ProgressReporter<'_>,
        pacer: &Pacer,
        images_end: u32,
    ) -> Result<MaterializeReport> {
        let transfer = &self.config.transfer;

        let item_band = reporter.band(25, 45);
        item_band.begin(
            Stage::Items,
            items.len(),
            format!(
                "Found {} items and {} transactions",
                items.len(),
                transactions.len()
            ),
        );
        TableWriter::create(&dir.join(ITEMS_FILE), ITEM_COLUMNS, transfer.write_batch_size)?
            .write_records(items, item_to_fields, Stage::Items, &item_band, pacer)?;

        TableWriter::create(
            &dir.join(TRANSACTIONS_FILE),
            TRANSACTION_COLUMNS,
            transfer.write_batch_size,
        )?
        .write_records(
            transactions,
            transaction_to_fields,
            Stage::Transactions,
            &reporter.band(45, 60),
            pacer,
        )?;

        let images_dir = dir.join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).map_err(|e| {
            Error::failed("create_images_dir", format!("{}: {e}", images_dir.display()))
        })?;
        materialize_images(
            items,
            &images_dir,
            transfer.image_yield_interval,
            &reporter.band(60, images_end),
            pacer,
        )
    }
}

/// Returns `<dir>/stockpile_export_<YYYYMMDD_HHMMSS>.zip`, adding a random
/// suffix if that name is taken.
fn archive_path(dir: &Path) -> PathBuf {
    let stem = format!("stockpile_export_{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(format!("{stem}.zip"));
    if path.exists() {
        let suffix = Uuid::new_v4().simple().to_string();
        return dir.join(format!("{stem}_{}.zip", &suffix[..8]));
    }
    path
}
