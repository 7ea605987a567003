//! Unpacks an archive into a staging directory.

use crate::io::formats::TABLE_EXTENSION;
use crate::io::pacing::Pacer;
use crate::io::progress::{ProgressReporter, Stage};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;

/// Outcome of an extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries in the archive, directories included.
    pub entries: usize,
    /// Files written.
    pub files: usize,
    /// Entries skipped because their path escapes the destination.
    pub skipped: usize,
}

/// Extracts every entry of `archive` under `dest`.
///
/// The archive is read into memory whole. Table entries (`.csv`) are decoded
/// as UTF-8 text, with invalid sequences replaced; all other entries are
/// copied as bytes. Progress reports entries processed out of entries total.
///
/// # Errors
///
/// Returns [`Error::OutOfMemory`] if the archive or an entry cannot be
/// buffered, and [`Error::OperationFailed`] if the archive is unreadable or
/// a file cannot be written.
#[instrument(skip_all, fields(operation = "extract_archive", archive = %archive.display()))]
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    image_yield_interval: usize,
    reporter: &ProgressReporter<'_>,
    pacer: &Pacer,
) -> Result<ExtractReport> {
    let bytes = read_archive(archive)?;
    let mut zip = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::failed("open_archive", format!("{}: {e}", archive.display())))?;

    let mut report = ExtractReport {
        entries: zip.len(),
        ..ExtractReport::default()
    };
    reporter.begin(Stage::Extracting, report.entries, "Extracting archive");

    for index in 0..report.entries {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| Error::failed("read_archive_entry", format!("#{index}: {e}")))?;

        if !entry.is_dir() {
            match entry.enclosed_name() {
                Some(relative) => {
                    let out = dest.join(&relative);
                    if let Some(parent) = out.parent() {
                        fs::create_dir_all(parent).map_err(|e| {
                            Error::failed("create_extract_dir", format!("{}: {e}", parent.display()))
                        })?;
                    }
                    let is_table = relative
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION));
                    if is_table {
                        let declared = entry.size();
                        write_text_entry(&mut entry, declared, &out)?;
                    } else {
                        let mut file = File::create(&out).map_err(|e| {
                            Error::failed("write_extracted_file", format!("{}: {e}", out.display()))
                        })?;
                        io::copy(&mut entry, &mut file).map_err(|e| {
                            Error::failed("write_extracted_file", format!("{}: {e}", out.display()))
                        })?;
                    }
                    report.files += 1;
                },
                None => {
                    report.skipped += 1;
                    tracing::warn!(entry = entry.name(), "Skipping archive entry with unsafe path");
                },
            }
        }

        let done = index + 1;
        reporter.report(
            Stage::Extracting,
            done,
            report.entries,
            format!("Extracted {done} of {} entries", report.entries),
        );
        pacer.tick(done, image_yield_interval)?;
    }

    tracing::info!(files = report.files, skipped = report.skipped, "Extracted archive");
    Ok(report)
}

fn read_archive(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::MissingInput {
                path: path.to_path_buf(),
            }
        } else {
            Error::failed("open_archive", format!("{}: {e}", path.display()))
        }
    })?;
    let size = file
        .metadata()
        .map_err(|e| Error::failed("stat_archive", format!("{}: {e}", path.display())))?
        .len();

    let mut bytes = Vec::new();
    reserve(&mut bytes, size, "reading the archive")?;
    file.read_to_end(&mut bytes)
        .map_err(|e| read_error(e, "reading the archive", "read_archive", path))?;
    Ok(bytes)
}

/// Decodes a table entry of `declared` uncompressed bytes and writes it as text.
fn write_text_entry(entry: &mut impl Read, declared: u64, out: &Path) -> Result<()> {
    let context = format!("decoding {}", out.display());
    let mut raw = Vec::new();
    reserve(&mut raw, declared, &context)?;
    entry
        .read_to_end(&mut raw)
        .map_err(|e| read_error(e, &context, "read_table_entry", out))?;
    let text = String::from_utf8_lossy(&raw);
    fs::write(out, text.as_bytes())
        .map_err(|e| Error::failed("write_table_entry", format!("{}: {e}", out.display())))
}

fn read_error(e: io::Error, context: &str, operation: &str, path: &Path) -> Error {
    if e.kind() == io::ErrorKind::OutOfMemory {
        metrics::counter!("stockpile_archive_oom_total").increment(1);
        return Error::OutOfMemory {
            context: context.to_string(),
        };
    }
    Error::failed(operation, format!("{}: {e}", path.display()))
}

fn reserve(buffer: &mut Vec<u8>, size: u64, context: &str) -> Result<()> {
    let size = usize::try_from(size).map_err(|_| Error::OutOfMemory {
        context: context.to_string(),
    })?;
    buffer.try_reserve_exact(size).map_err(|_| {
        metrics::counter!("stockpile_archive_oom_total").increment(1);
        Error::OutOfMemory {
            context: context.to_string(),
        }
    })
}
