//! ZIP packaging and extraction.
//!
//! Both directions hold the whole archive in memory, so archive import is
//! gated by [`probe_archive`]: anything above the configured limit is
//! rejected up front with instructions to extract it by hand and import
//! the folder instead.

pub mod extract;
pub mod pack;

pub use extract::{ExtractReport, extract_archive};
pub use pack::{ArchivePackager, PackagedArchive};

use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Whether an archive can be decoded in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveRisk {
    /// At or below the limit.
    Safe,
    /// Above the limit; extract manually.
    Risky,
}

/// Classifies an archive of `size` bytes against `limit`.
#[must_use]
pub const fn classify_archive_size(size: u64, limit: u64) -> ArchiveRisk {
    if size <= limit {
        ArchiveRisk::Safe
    } else {
        ArchiveRisk::Risky
    }
}

/// Returns the archive size in bytes.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] if the file does not exist.
pub fn archive_size(path: &Path) -> Result<u64> {
    fs::metadata(path).map(|meta| meta.len()).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::MissingInput {
                path: path.to_path_buf(),
            }
        } else {
            Error::failed("stat_archive", format!("{}: {e}", path.display()))
        }
    })
}

/// Returns true when the archive at `path` is small enough to import in memory.
///
/// # Errors
///
/// Returns an error if the file cannot be inspected.
pub fn probe_archive(path: &Path, limit: u64) -> Result<bool> {
    let size = archive_size(path)?;
    let risk = classify_archive_size(size, limit);
    tracing::debug!(path = %path.display(), size, limit, ?risk, "Probed archive");
    Ok(risk == ArchiveRisk::Safe)
}
