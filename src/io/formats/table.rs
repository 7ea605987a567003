//! Batched table files.
//!
//! [`TableWriter`] appends one rendered block per batch through a single
//! append-mode handle, so writing N rows costs O(N) regardless of batch
//! count. [`TableReader`] streams rows back in batches; the file is never
//! held in memory whole.

use super::tabular::render_row;
use crate::io::pacing::Pacer;
use crate::io::progress::{ProgressReporter, Stage};
use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends rendered rows to a table file in batches.
#[derive(Debug)]
pub struct TableWriter {
    file: File,
    path: PathBuf,
    batch_size: usize,
    appends: usize,
}

impl TableWriter {
    /// Creates (or truncates) `path` and writes `header` as the first row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path, header: &[&str], batch_size: usize) -> Result<Self> {
        fs::write(path, render_row(header))
            .map_err(|e| Error::failed("write_table_header", format!("{}: {e}", path.display())))?;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| Error::failed("open_table", format!("{}: {e}", path.display())))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            batch_size: batch_size.max(1),
            appends: 0,
        })
    }

    /// Returns the number of row blocks appended so far.
    #[must_use]
    pub const fn appends(&self) -> usize {
        self.appends
    }

    /// Writes every record, one append per batch.
    ///
    /// After each batch the writer reports `(rows written, total)` for
    /// `stage` and passes a pacer checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if an append fails or the pacer observes cancellation.
    pub fn write_records<T, F>(
        &mut self,
        records: &[T],
        to_fields: F,
        stage: Stage,
        reporter: &ProgressReporter<'_>,
        pacer: &Pacer,
    ) -> Result<usize>
    where
        F: Fn(&T) -> Vec<String>,
    {
        let total = records.len();
        let mut written = 0;

        for chunk in records.chunks(self.batch_size) {
            let mut block = String::new();
            for record in chunk {
                block.push_str(&render_row(&to_fields(record)));
            }
            self.file.write_all(block.as_bytes()).map_err(|e| {
                Error::failed("append_table", format!("{}: {e}", self.path.display()))
            })?;
            self.appends += 1;
            written += chunk.len();

            reporter.report(stage, written, total, format!("Wrote {written} of {total} {stage}"));
            pacer.checkpoint()?;
        }

        self.file
            .flush()
            .map_err(|e| Error::failed("flush_table", format!("{}: {e}", self.path.display())))?;
        tracing::debug!(
            path = %self.path.display(),
            rows = written,
            appends = self.appends,
            "Wrote table"
        );
        Ok(written)
    }
}

/// Streams data rows from a table file in batches.
///
/// A first row whose first cell is `id` (any case) is treated as the header
/// and skipped. Rows whose cells are all blank are dropped. Invalid UTF-8 is
/// replaced rather than rejected.
pub struct TableReader {
    reader: csv::Reader<File>,
    record: csv::ByteRecord,
    path: PathBuf,
    batch_size: usize,
    at_start: bool,
}

impl std::fmt::Debug for TableReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableReader")
            .field("path", &self.path)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl TableReader {
    /// Opens `path` for batched reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the file does not exist.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::failed("open_table", format!("{}: {e}", path.display())))?;

        Ok(Self {
            reader,
            record: csv::ByteRecord::new(),
            path: path.to_path_buf(),
            batch_size: batch_size.max(1),
            at_start: true,
        })
    }

    /// Returns the next batch of up to `batch_size` rows, or `None` at end of file.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    pub fn next_batch(&mut self) -> Result<Option<Vec<Vec<String>>>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.next_row()? {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok((!batch.is_empty()).then_some(batch))
    }

    fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            let more = self
                .reader
                .read_byte_record(&mut self.record)
                .map_err(|e| Error::failed("read_table", format!("{}: {e}", self.path.display())))?;
            if !more {
                return Ok(None);
            }

            let row: Vec<String> = self
                .record
                .iter()
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect();
            let first = std::mem::replace(&mut self.at_start, false);
            if (first && is_header(&row)) || is_blank(&row) {
                continue;
            }
            return Ok(Some(row));
        }
    }
}

/// Counts the data rows of a table without keeping them.
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable.
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = TableReader::open(path, 1)?;
    let mut count = 0;
    while reader.next_row()?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn is_header(row: &[String]) -> bool {
    row.first()
        .is_some_and(|cell| cell.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case("id"))
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::tabular::parse_table;
    use crate::io::pacing::CancellationToken;
    use std::time::Duration;

    fn pacer() -> Pacer {
        Pacer::new(Duration::ZERO, CancellationToken::new())
    }

    fn numbered(n: usize) -> Vec<(usize, String)> {
        (1..=n).map(|i| (i, format!("item, no. {i}"))).collect()
    }

    #[test]
    fn test_one_append_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        let mut writer = TableWriter::create(&path, &["id", "name"], 100).unwrap();

        let written = writer
            .write_records(
                &numbered(250),
                |(id, name)| vec![id.to_string(), name.clone()],
                Stage::Items,
                &ProgressReporter::silent(),
                &pacer(),
            )
            .unwrap();

        assert_eq!(written, 250);
        assert_eq!(writer.appends(), 3);

        let text = fs::read_to_string(&path).unwrap();
        let rows = parse_table(&text);
        assert_eq!(rows.len(), 251);
        assert_eq!(rows[0], vec!["id", "name"]);
        assert_eq!(rows[250], vec!["250", "item, no. 250"]);
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        let mut writer = TableWriter::create(&path, &["id", "action"], 10).unwrap();
        writer
            .write_records::<(usize, String), _>(
                &[],
                |_| Vec::new(),
                Stage::Transactions,
                &ProgressReporter::silent(),
                &pacer(),
            )
            .unwrap();

        assert_eq!(writer.appends(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,action\n");
        assert_eq!(count_rows(&path).unwrap(), 0);
    }

    #[test]
    fn test_writer_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        let token = CancellationToken::new();
        token.cancel();

        let mut writer = TableWriter::create(&path, &["id"], 10).unwrap();
        let err = writer
            .write_records(
                &numbered(30),
                |(id, _)| vec![id.to_string()],
                Stage::Items,
                &ProgressReporter::silent(),
                &Pacer::new(Duration::ZERO, token),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(writer.appends(), 1);
    }

    #[test]
    fn test_reader_batches_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        let mut text = String::from("ID,name\n");
        for i in 1..=7 {
            text.push_str(&format!("{i},\"name {i}\nsecond line\"\n"));
            if i == 3 {
                text.push_str(",,\n\n");
            }
        }
        fs::write(&path, &text).unwrap();

        let mut reader = TableReader::open(&path, 3).unwrap();
        let mut sizes = Vec::new();
        let mut rows = Vec::new();
        while let Some(batch) = reader.next_batch().unwrap() {
            sizes.push(batch.len());
            rows.extend(batch);
        }

        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(rows[0], vec!["1", "name 1\nsecond line"]);
        assert_eq!(count_rows(&path).unwrap(), 7);
    }

    #[test]
    fn test_reader_agrees_with_parser() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let text = "1,\"a \"\"quoted\"\" word\",x\r\n2,short\n3,\"multi\r\nline\",,\n";
        fs::write(&path, text).unwrap();

        let mut reader = TableReader::open(&path, 10).unwrap();
        let streamed = reader.next_batch().unwrap().unwrap();
        assert_eq!(streamed, parse_table(text));
    }

    #[test]
    fn test_headerless_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        fs::write(&path, "5,Boot\n6,Sandal").unwrap();
        assert_eq!(count_rows(&path).unwrap(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TableReader::open(&dir.path().join("items.csv"), 10).unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }
}
