//! Persistent image store.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The application's directory of item images.
///
/// Imported images are copied in under the store's own naming convention,
/// `img_<uuid-v7>.<ext>`, so names never collide with existing files and
/// sort by arrival time.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Creates a store rooted at `dir`. The directory is created lazily.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `source` into the store and returns the new path.
    ///
    /// Uses an OS-level copy, so image bytes never pass through this process.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the copy fails.
    pub fn import_copy(&self, source: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::OperationFailed {
            operation: "create_image_store".to_string(),
            cause: format!("{}: {e}", self.dir.display()),
        })?;

        let dest = self.dir.join(Self::stored_name(source));
        fs::copy(source, &dest).map_err(|e| Error::OperationFailed {
            operation: "copy_image".to_string(),
            cause: format!("{} -> {}: {e}", source.display(), dest.display()),
        })?;
        Ok(dest)
    }

    fn stored_name(source: &Path) -> String {
        let id = Uuid::now_v7().simple();
        match source.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("img_{id}.{}", ext.to_lowercase()),
            _ => format!("img_{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_copy_preserves_bytes() {
        let src_dir = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("7_Shoe.PNG");
        fs::write(&source, [0x89, b'P', b'N', b'G', 0, 1, 2]).unwrap();

        let store = ImageStore::new(store_dir.path().join("images"));
        let stored = store.import_copy(&source).unwrap();

        assert!(stored.starts_with(store.dir()));
        let name = stored.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("img_"));
        assert!(name.ends_with(".png"));
        assert_eq!(fs::read(&stored).unwrap(), fs::read(&source).unwrap());
    }

    #[test]
    fn test_two_imports_do_not_collide() {
        let src_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("a.jpg");
        fs::write(&source, b"jpg").unwrap();

        let store = ImageStore::new(src_dir.path().join("store"));
        let first = store.import_copy(&source).unwrap();
        let second = store.import_copy(&source).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let err = store.import_copy(&dir.path().join("nope.png")).unwrap_err();
        assert!(err.to_string().contains("copy_image"));
    }
}
