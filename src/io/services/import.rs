//! Inventory import service.
//!
//! Imports an export folder or archive into the store. Rows are streamed in
//! batches and inserted one at a time; a row that cannot be decoded or
//! inserted is counted and reported, never fatal. Only a missing
//! `items.csv`, an unreadable table, an oversized archive, or cancellation
//! stop an import.

use crate::config::{StockpileConfig, TransferSettings};
use crate::io::archive::{ArchiveRisk, archive_size, classify_archive_size, extract_archive};
use crate::io::formats::records::{decode_item, decode_transaction};
use crate::io::formats::{IMAGES_DIR, ITEMS_FILE, TRANSACTIONS_FILE, TableReader, count_rows};
use crate::io::images::ImageFolder;
use crate::io::pacing::{CancellationToken, Pacer};
use crate::io::progress::{ProgressCallback, ProgressReporter, Stage};
use crate::io::staging::StagingDir;
use crate::storage::{ImageStore, InventoryStore};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Most warning or error messages kept in an [`ImportResult`]; later ones
/// are only counted.
pub const MAX_RECORDED_MESSAGES: usize = 200;

/// Options for an import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Token observed at every yield point.
    pub cancellation: CancellationToken,
}

impl ImportOptions {
    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// Items inserted.
    pub items_imported: usize,
    /// Item rows skipped as invalid.
    pub items_skipped: usize,
    /// Item rows the store rejected.
    pub items_failed: usize,
    /// Inserted items carrying the unknown-price sentinel.
    pub items_without_price: usize,
    /// Images attached to inserted items; `None` when the source had no images folder.
    pub images_imported: Option<usize>,
    /// Images available in the source; `None` when it had no images folder.
    pub images_total: Option<usize>,
    /// Images attached by a heuristic rule rather than by name.
    pub images_guessed: usize,
    /// Transactions inserted.
    pub transactions_imported: usize,
    /// Transaction rows skipped as invalid.
    pub transactions_skipped: usize,
    /// Transaction rows the store rejected.
    pub transactions_failed: usize,
    /// Non-fatal issues, such as defaulted cells or unmatched images.
    pub warnings: Vec<String>,
    /// Rows that were not imported, with the reason.
    pub errors: Vec<String>,
    /// Messages beyond [`MAX_RECORDED_MESSAGES`] that were dropped.
    pub suppressed_messages: usize,
}

impl ImportResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether anything was imported.
    #[must_use]
    pub const fn has_imports(&self) -> bool {
        self.items_imported > 0 || self.transactions_imported > 0
    }

    /// Returns whether any row was not imported.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.items_skipped + self.items_failed + self.transactions_skipped + self.transactions_failed
            > 0
    }

    /// Returns a summary for the user, including the advisory about
    /// unpriced items when there are any.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Imported {} items and {} transactions.",
            self.items_imported, self.transactions_imported
        )];

        if let (Some(imported), Some(total)) = (self.images_imported, self.images_total) {
            lines.push(format!("Attached {imported} of {total} images."));
            if self.images_guessed > 0 {
                lines.push(format!(
                    "{} images were matched by similar name only; check them.",
                    self.images_guessed
                ));
            }
        }
        if self.items_without_price > 0 {
            lines.push(format!(
                "{} items have no price set and need attention.",
                self.items_without_price
            ));
        }

        let skipped = self.items_skipped + self.transactions_skipped;
        let failed = self.items_failed + self.transactions_failed;
        if skipped + failed > 0 {
            lines.push(format!(
                "{skipped} rows were skipped as invalid and {failed} could not be saved."
            ));
        }
        lines.join(" ")
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        if self.warnings.len() < MAX_RECORDED_MESSAGES {
            self.warnings.push(message);
        } else {
            self.suppressed_messages += 1;
        }
    }

    fn error(&mut self, message: String) {
        tracing::warn!("{message}");
        if self.errors.len() < MAX_RECORDED_MESSAGES {
            self.errors.push(message);
        } else {
            self.suppressed_messages += 1;
        }
    }
}

/// Service importing exported inventories.
pub struct ImportService {
    store: Arc<dyn InventoryStore>,
    images: ImageStore,
    transfer: TransferSettings,
    staging_root: PathBuf,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(store: Arc<dyn InventoryStore>, config: &StockpileConfig) -> Self {
        Self {
            store,
            images: ImageStore::new(&config.image_dir),
            transfer: config.transfer.clone(),
            staging_root: config.staging_root.clone(),
        }
    }

    /// Imports from a folder or an archive, depending on what `path` is.
    ///
    /// # Errors
    ///
    /// See [`import_from_folder`](Self::import_from_folder) and
    /// [`import_from_archive`](Self::import_from_archive).
    pub fn import_from_path(
        &self,
        path: &Path,
        options: &ImportOptions,
        progress: Option<&ProgressCallback<'_>>,
    ) -> Result<ImportResult> {
        if path.is_dir() {
            self.import_from_folder(path, options, progress)
        } else {
            self.import_from_archive(path, options, progress)
        }
    }

    /// Imports an archive.
    ///
    /// The archive size is checked first; archives above the configured
    /// limit are rejected before anything is read. Extraction reports
    /// progress in 0-50% and the folder import in 50-100%. The staging
    /// directory is removed whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveTooLarge`] or [`Error::OutOfMemory`] when the
    /// archive must be extracted by hand, plus every error of
    /// [`import_from_folder`](Self::import_from_folder).
    #[instrument(skip_all, fields(operation = "import_archive", archive = %archive.display()))]
    pub fn import_from_archive(
        &self,
        archive: &Path,
        options: &ImportOptions,
        progress: Option<&ProgressCallback<'_>>,
    ) -> Result<ImportResult> {
        observe("archive", || {
            let size = archive_size(archive)?;
            let limit = self.transfer.archive_memory_limit;
            if classify_archive_size(size, limit) == ArchiveRisk::Risky {
                tracing::warn!(size, limit, "Archive too large to import in memory");
                return Err(Error::ArchiveTooLarge { size, limit });
            }

            let reporter = ProgressReporter::new(progress);
            let pacer = self.pacer(options);
            let staging = StagingDir::create(&self.staging_root, "import")?;
            extract_archive(
                archive,
                staging.path(),
                self.transfer.image_yield_interval,
                &reporter.band(0, 50),
                &pacer,
            )?;

            let result = self.import_staged(staging.path(), &reporter.band(50, 100), &pacer);
            staging.cleanup();
            result
        })
    }

    /// Imports an export folder.
    ///
    /// Memory use is bounded by the batch size, whatever the folder holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the folder has no `items.csv`, an
    /// error if a table cannot be read, or [`Error::Cancelled`].
    #[instrument(skip_all, fields(operation = "import_folder", folder = %folder.display()))]
    pub fn import_from_folder(
        &self,
        folder: &Path,
        options: &ImportOptions,
        progress: Option<&ProgressCallback<'_>>,
    ) -> Result<ImportResult> {
        observe("folder", || {
            self.import_staged(folder, &ProgressReporter::new(progress), &self.pacer(options))
        })
    }

    fn pacer(&self, options: &ImportOptions) -> Pacer {
        Pacer::new(self.transfer.batch_pause, options.cancellation.clone())
    }

    fn import_staged(
        &self,
        folder: &Path,
        reporter: &ProgressReporter<'_>,
        pacer: &Pacer,
    ) -> Result<ImportResult> {
        let items_path = folder.join(ITEMS_FILE);
        if !items_path.is_file() {
            return Err(Error::MissingInput { path: items_path });
        }

        let images = ImageFolder::scan(&folder.join(IMAGES_DIR));
        let mut result = ImportResult::new();
        if images.is_present() {
            result.images_total = Some(images.len());
            result.images_imported = Some(0);
        } else {
            tracing::info!("Import source has no images folder");
        }
        reporter.report(
            Stage::Preparing,
            0,
            1,
            format!("Found {} images", images.len()),
        );

        let transactions_path = folder.join(TRANSACTIONS_FILE);
        let has_transactions = transactions_path.is_file();
        let items_end = if has_transactions { 75 } else { 99 };

        self.import_items(&items_path, &images, &reporter.band(5, items_end), pacer, &mut result)?;
        if has_transactions {
            self.import_transactions(&transactions_path, &reporter.band(75, 99), pacer, &mut result)?;
        } else {
            tracing::info!("Import source has no transactions table");
        }

        reporter.complete(result.summary());
        Ok(result)
    }

    fn import_items(
        &self,
        path: &Path,
        images: &ImageFolder,
        reporter: &ProgressReporter<'_>,
        pacer: &Pacer,
        result: &mut ImportResult,
    ) -> Result<()> {
        let total = count_rows(path)?;
        reporter.begin(Stage::Items, total, format!("Importing {total} items"));

        let mut reader = TableReader::open(path, self.transfer.item_yield_interval)?;
        let mut row = 0;
        while let Some(batch) = reader.next_batch()? {
            for fields in batch {
                row += 1;
                self.import_item_row(row, &fields, images, result);
            }
            reporter.report(
                Stage::Items,
                row,
                total,
                format!("Imported {row} of {total} items"),
            );
            pacer.checkpoint()?;
        }
        Ok(())
    }

    fn import_item_row(
        &self,
        row: usize,
        fields: &[String],
        images: &ImageFolder,
        result: &mut ImportResult,
    ) {
        let decoded = match decode_item(fields) {
            Ok(decoded) => decoded,
            Err(e) => {
                result.items_skipped += 1;
                result.error(format!("Item row {row}: skipped: {e}"));
                return;
            },
        };
        for note in decoded.notes {
            result.warn(format!("Item row {row}: {note}"));
        }

        let mut item = decoded.item;
        let mut attached = None;
        if let Some(hint) = decoded.image_hint.as_deref() {
            match images.resolve(hint) {
                Some(found) => match self.images.import_copy(&images.path_of(&found.file_name)) {
                    Ok(stored) => {
                        item.image_uri = Some(stored.display().to_string());
                        attached = Some((stored, found.strategy));
                    },
                    Err(e) => result.warn(format!("Item row {row}: image not copied: {e}")),
                },
                None if images.is_present() => {
                    result.warn(format!("Item row {row}: no image matches '{hint}'"));
                },
                None => {},
            }
        }

        match self.store.insert_item_import(&item) {
            Ok(()) => {
                result.items_imported += 1;
                if item.has_unknown_price() {
                    result.items_without_price += 1;
                }
                if let Some((_, strategy)) = attached {
                    result.images_imported = Some(result.images_imported.unwrap_or(0) + 1);
                    if strategy.is_heuristic() {
                        result.images_guessed += 1;
                        tracing::debug!(row, hint = ?decoded.image_hint, %strategy, "Image matched heuristically");
                    }
                }
            },
            Err(e) => {
                result.items_failed += 1;
                metrics::counter!("stockpile_import_row_failures_total", "table" => "items")
                    .increment(1);
                result.error(format!("Item row {row} ('{}'): {e}", item.name));
                if let Some((stored, _)) = attached
                    && let Err(e) = std::fs::remove_file(&stored)
                {
                    tracing::debug!(path = %stored.display(), error = %e, "Could not remove orphaned image");
                }
            },
        }
    }

    fn import_transactions(
        &self,
        path: &Path,
        reporter: &ProgressReporter<'_>,
        pacer: &Pacer,
        result: &mut ImportResult,
    ) -> Result<()> {
        let total = count_rows(path)?;
        reporter.begin(
            Stage::Transactions,
            total,
            format!("Importing {total} transactions"),
        );

        let mut reader = TableReader::open(path, self.transfer.transaction_yield_interval)?;
        let mut row = 0;
        while let Some(batch) = reader.next_batch()? {
            for fields in batch {
                row += 1;
                match decode_transaction(&fields) {
                    Ok(tx) => match self.store.insert_transaction_import(&tx) {
                        Ok(()) => result.transactions_imported += 1,
                        Err(e) => {
                            result.transactions_failed += 1;
                            metrics::counter!(
                                "stockpile_import_row_failures_total",
                                "table" => "transactions"
                            )
                            .increment(1);
                            result.error(format!("Transaction row {row}: {e}"));
                        },
                    },
                    Err(e) => {
                        result.transactions_skipped += 1;
                        result.error(format!("Transaction row {row}: skipped: {e}"));
                    },
                }
            }
            reporter.report(
                Stage::Transactions,
                row,
                total,
                format!("Imported {row} of {total} transactions"),
            );
            pacer.checkpoint()?;
        }
        Ok(())
    }
}

fn observe(
    source: &'static str,
    run: impl FnOnce() -> Result<ImportResult>,
) -> Result<ImportResult> {
    let start = Instant::now();
    let result = run();
    let status = match &result {
        Ok(import) => {
            tracing::info!(
                items = import.items_imported,
                transactions = import.transactions_imported,
                without_price = import.items_without_price,
                "Import complete"
            );
            "success"
        },
        Err(Error::Cancelled) => {
            tracing::info!("Import cancelled");
            "cancelled"
        },
        Err(e) => {
            tracing::error!(error = %e, "Import failed");
            "error"
        },
    };
    metrics::counter!("stockpile_imports_total", "source" => source, "status" => status)
        .increment(1);
    metrics::histogram!("stockpile_import_duration_ms", "source" => source)
        .record(start.elapsed().as_secs_f64() * 1000.0);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, Transaction};
    use crate::storage::MemoryStore;
    use std::fs;

    fn config(root: &Path) -> StockpileConfig {
        StockpileConfig::with_data_dir_defaults(root).with_transfer(TransferSettings::unpaced())
    }

    struct RejectingStore {
        inner: MemoryStore,
        reject_name: &'static str,
    }

    impl InventoryStore for RejectingStore {
        fn items(&self) -> Result<Vec<Item>> {
            self.inner.items()
        }

        fn all_transactions(&self) -> Result<Vec<Transaction>> {
            self.inner.all_transactions()
        }

        fn insert_item_import(&self, item: &Item) -> Result<()> {
            if item.name == self.reject_name {
                return Err(Error::failed("insert_item", "constraint violation"));
            }
            self.inner.insert_item_import(item)
        }

        fn insert_transaction_import(&self, transaction: &Transaction) -> Result<()> {
            self.inner.insert_transaction_import(transaction)
        }
    }

    #[test]
    fn test_missing_items_table() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("export");
        fs::create_dir(&folder).unwrap();

        let service = ImportService::new(Arc::new(MemoryStore::new()), &config(root.path()));
        let err = service
            .import_from_folder(&folder, &ImportOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput { ref path } if path.ends_with(ITEMS_FILE)));
    }

    #[test]
    fn test_rows_skipped_and_sentinel_counted() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("export");
        fs::create_dir(&folder).unwrap();
        fs::write(
            folder.join(ITEMS_FILE),
            "id,name,code\n1,Boot,B1,,,,,,,,,,-1\n2,,B2\n3,Clog,C3\n",
        )
        .unwrap();
        fs::write(
            folder.join(TRANSACTIONS_FILE),
            "id,action,itemId,itemName,timestamp,details\n1,sale,1,Boot,10,\n2,,1,Boot,11,\n3,restock,1,Boot,12,\n",
        )
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let service = ImportService::new(store.clone(), &config(root.path()));
        let result = service
            .import_from_folder(&folder, &ImportOptions::default(), None)
            .unwrap();

        assert_eq!(result.items_imported, 2);
        assert_eq!(result.items_skipped, 1);
        assert_eq!(result.items_without_price, 1);
        assert_eq!(result.transactions_imported, 1);
        assert_eq!(result.transactions_skipped, 2);
        assert_eq!(result.images_total, None);
        assert_eq!(store.item_count().unwrap(), 2);
        assert!(result.summary().contains("1 items have no price set"));
    }

    #[test]
    fn test_insert_failure_is_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("export");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join(ITEMS_FILE), "1,Boot\n2,Broken\n3,Clog\n").unwrap();

        let store = Arc::new(RejectingStore {
            inner: MemoryStore::new(),
            reject_name: "Broken",
        });
        let service = ImportService::new(store.clone(), &config(root.path()));
        let result = service
            .import_from_folder(&folder, &ImportOptions::default(), None)
            .unwrap();

        assert_eq!(result.items_imported, 2);
        assert_eq!(result.items_failed, 1);
        assert!(result.errors[0].contains("Broken"));
        assert_eq!(store.item_count().unwrap(), 2);
    }

    #[test]
    fn test_images_matched_after_id_change() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("export");
        fs::create_dir_all(folder.join(IMAGES_DIR)).unwrap();
        fs::write(folder.join(IMAGES_DIR).join("shoe.png"), b"png").unwrap();
        fs::write(folder.join(IMAGES_DIR).join("boots.jpg"), b"jpg").unwrap();
        fs::write(
            folder.join(ITEMS_FILE),
            "1,Shoe,,,,,,,,,7_shoe.png\n2,Boot,,,,,,,,,4_redboots.jpg\n3,Hat,,,,,,,,,3_hat.gif\n",
        )
        .unwrap();

        let config = config(root.path());
        let store = Arc::new(MemoryStore::new());
        let service = ImportService::new(store.clone(), &config);
        let result = service
            .import_from_folder(&folder, &ImportOptions::default(), None)
            .unwrap();

        assert_eq!(result.images_total, Some(2));
        assert_eq!(result.images_imported, Some(2));
        assert_eq!(result.images_guessed, 1);
        assert_eq!(result.warnings.len(), 1);

        let items = store.items().unwrap();
        let shoe = items[0].image_uri.as_deref().unwrap();
        assert!(Path::new(shoe).starts_with(&config.image_dir));
        assert_eq!(fs::read(shoe).unwrap(), b"png");
        assert!(items[2].image_uri.is_none());
    }

    #[test]
    fn test_cancelled_between_batches() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("export");
        fs::create_dir(&folder).unwrap();
        let rows: String = (1..=120).map(|i| format!("{i},Item {i}\n")).collect();
        fs::write(folder.join(ITEMS_FILE), rows).unwrap();

        let token = CancellationToken::new();
        let store = Arc::new(MemoryStore::new());
        let service = ImportService::new(store.clone(), &config(root.path()));
        let cancel_after_first = |p: &crate::io::progress::Progress| {
            if p.stage == Stage::Items && p.current >= 50 {
                token.cancel();
            }
        };

        let err = service
            .import_from_folder(
                &folder,
                &ImportOptions::default().with_cancellation(token.clone()),
                Some(&cancel_after_first),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(store.item_count().unwrap(), 50);
    }

    #[test]
    fn test_summary_without_advisories() {
        let result = ImportResult {
            items_imported: 3,
            transactions_imported: 4,
            images_imported: Some(1),
            images_total: Some(1),
            ..ImportResult::default()
        };
        assert_eq!(
            result.summary(),
            "Imported 3 items and 4 transactions. Attached 1 of 1 images."
        );
        assert!(result.has_imports());
        assert!(!result.has_errors());
    }
}
