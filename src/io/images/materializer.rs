//! Copies item images into an export's `images/` folder.

use crate::io::pacing::Pacer;
use crate::io::progress::{ProgressReporter, Stage};
use crate::models::Item;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Outcome of a materialization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Items that reference an image.
    pub total: usize,
    /// Images copied.
    pub copied: usize,
    /// Images that could not be copied.
    pub failed: usize,
}

/// Resolves an item image reference to a filesystem path.
///
/// Accepts plain paths and `file://` URIs.
#[must_use]
pub fn image_source_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Sums the sizes of the image files items reference. Missing files count as zero.
#[must_use]
pub fn measure_image_payload(items: &[Item]) -> u64 {
    items
        .iter()
        .filter_map(Item::image_ref)
        .filter_map(|uri| fs::metadata(image_source_path(uri)).ok())
        .map(|meta| meta.len())
        .sum()
}

/// Copies each item's image to `images_dir/<id>_<basename>`.
///
/// `images_dir` must already exist.
///
/// Copies go through the filesystem, so image bytes never enter memory.
/// A copy that fails is logged and counted, and the pass continues.
///
/// # Errors
///
/// Returns an error only when cancellation is observed.
#[instrument(skip_all, fields(operation = "materialize_images", items = items.len()))]
pub fn materialize_images(
    items: &[Item],
    images_dir: &Path,
    image_yield_interval: usize,
    reporter: &ProgressReporter<'_>,
    pacer: &Pacer,
) -> Result<MaterializeReport> {
    let with_images: Vec<(&Item, String)> = items
        .iter()
        .filter_map(|item| item.export_image_name().map(|name| (item, name)))
        .collect();

    let mut report = MaterializeReport {
        total: with_images.len(),
        ..MaterializeReport::default()
    };
    reporter.begin(Stage::Images, report.total, "Copying images");

    for (index, (item, name)) in with_images.iter().enumerate() {
        let Some(uri) = item.image_ref() else {
            continue;
        };
        let source = image_source_path(uri);
        match fs::copy(&source, images_dir.join(name)) {
            Ok(_) => report.copied += 1,
            Err(e) => {
                report.failed += 1;
                metrics::counter!("stockpile_image_copy_failures_total").increment(1);
                tracing::warn!(
                    item_id = item.id,
                    source = %source.display(),
                    error = %e,
                    "Skipping image that could not be copied"
                );
            },
        }

        let done = index + 1;
        reporter.report(
            Stage::Images,
            done,
            report.total,
            format!("Copied image {done} of {}", report.total),
        );
        pacer.tick(done, image_yield_interval)?;
    }

    tracing::info!(
        copied = report.copied,
        failed = report.failed,
        "Materialized images"
    );
    Ok(report)
}
