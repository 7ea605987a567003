//! Packages a staging directory into a ZIP archive.

use crate::io::formats::{IMAGES_DIR, ITEMS_FILE, TRANSACTIONS_FILE};
use crate::io::pacing::Pacer;
use crate::io::progress::{ProgressReporter, Stage};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A finished archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    /// Where the archive was written.
    pub path: PathBuf,
    /// Number of entries.
    pub entries: usize,
    /// Number of image entries.
    pub images: usize,
    /// Archive size in bytes.
    pub bytes: u64,
}

/// Builds archives from staging directories.
#[derive(Debug, Clone, Copy)]
pub struct ArchivePackager {
    compression_level: i64,
    image_yield_interval: usize,
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self::new(6, 5)
    }
}

impl ArchivePackager {
    /// Creates a packager with the given deflate level and image yield interval.
    #[must_use]
    pub const fn new(compression_level: i64, image_yield_interval: usize) -> Self {
        Self {
            compression_level,
            image_yield_interval,
        }
    }

    /// Packages `staging` into `dest`.
    ///
    /// The two tables go in first, then every file under `images/` in name
    /// order. The archive is assembled in memory and written to `dest`
    /// through a temporary sibling, so `dest` never holds a partial archive.
    ///
    /// # Errors
    ///
    /// Returns an error if a staged file cannot be read, memory for the
    /// archive cannot be reserved, the destination cannot be written, or
    /// the pacer observes cancellation.
    #[instrument(skip_all, fields(operation = "package_archive", dest = %dest.display()))]
    pub fn package(
        &self,
        staging: &Path,
        dest: &Path,
        reporter: &ProgressReporter<'_>,
        pacer: &Pacer,
    ) -> Result<PackagedArchive> {
        let tables: Vec<&str> = [ITEMS_FILE, TRANSACTIONS_FILE]
            .into_iter()
            .filter(|name| staging.join(name).is_file())
            .collect();
        let images = list_images(&staging.join(IMAGES_DIR))?;
        let payload: u64 = tables
            .iter()
            .map(|name| staging.join(name))
            .chain(images.iter().map(|name| staging.join(IMAGES_DIR).join(name)))
            .filter_map(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();

        let mut buffer = Vec::new();
        buffer
            .try_reserve(usize::try_from(payload).unwrap_or(usize::MAX))
            .map_err(|_| Error::OutOfMemory {
                context: format!("building a {payload} byte archive"),
            })?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));
        let mut zip = ZipWriter::new(Cursor::new(buffer));

        reporter.begin(Stage::Packaging, images.len(), "Packaging archive");
        for name in &tables {
            add_entry(&mut zip, (*name).to_string(), &staging.join(name), options)?;
        }
        for (index, name) in images.iter().enumerate() {
            add_entry(
                &mut zip,
                format!("{IMAGES_DIR}/{name}"),
                &staging.join(IMAGES_DIR).join(name),
                options,
            )?;
            let done = index + 1;
            if done % self.image_yield_interval.max(1) == 0 || done == images.len() {
                reporter.report(
                    Stage::Packaging,
                    done,
                    images.len(),
                    format!("Packaged {done} of {} images", images.len()),
                );
            }
            pacer.tick(done, self.image_yield_interval)?;
        }

        let bytes = zip
            .finish()
            .map_err(|e| Error::failed("finish_archive", e))?
            .into_inner();
        write_atomically(dest, &bytes)?;

        let archive = PackagedArchive {
            path: dest.to_path_buf(),
            entries: tables.len() + images.len(),
            images: images.len(),
            bytes: bytes.len() as u64,
        };
        metrics::counter!("stockpile_archives_packaged_total").increment(1);
        tracing::info!(
            entries = archive.entries,
            bytes = archive.bytes,
            "Packaged archive"
        );
        Ok(archive)
    }
}

fn list_images(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::failed("list_staged_images", format!("{}: {e}", dir.display()))),
    };
    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

fn add_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: String,
    source: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut file = File::open(source)
        .map_err(|e| Error::failed("read_staged_file", format!("{}: {e}", source.display())))?;
    zip.start_file(name.as_str(), options)
        .map_err(|e| Error::failed("start_archive_entry", format!("{name}: {e}")))?;
    io::copy(&mut file, zip)
        .map_err(|e| Error::failed("write_archive_entry", format!("{name}: {e}")))?;
    Ok(())
}

fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = dest.with_extension("zip.part");
    let written = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, dest));

    written.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::failed("write_archive", format!("{}: {e}", dest.display()))
    })
}
