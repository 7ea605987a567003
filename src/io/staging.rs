//! Per-call staging directories.

use crate::{Error, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A uniquely named working directory removed when dropped.
///
/// Names embed a timestamp and a random suffix, so concurrent calls never
/// share a directory. Call [`keep`](Self::keep) to retain the contents.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    keep: bool,
}

impl StagingDir {
    /// Creates `<root>/<prefix>_<YYYYMMDD_HHMMSS>_<suffix>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: &Path, prefix: &str) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| {
            Error::failed("create_staging_root", format!("{}: {e}", root.display()))
        })?;

        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{prefix}_{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            &suffix[..8]
        );
        let path = root.join(name);
        fs::create_dir(&path)
            .map_err(|e| Error::failed("create_staging", format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "Created staging directory");
        Ok(Self { path, keep: false })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms cleanup and returns the path.
    #[must_use]
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }

    /// Removes the directory now. Failures are logged, never returned.
    pub fn cleanup(self) {
        drop(self);
    }

    fn remove(&self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => {
                metrics::counter!("stockpile_staging_cleanup_failures_total").increment(1);
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove staging directory"
                );
            },
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.keep {
            self.remove();
        }
    }
}
