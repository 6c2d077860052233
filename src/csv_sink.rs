//! CSV output with a UTF-8 byte-order mark, committed atomically.
//!
//! Rows are written to a temporary file next to the destination and persisted on
//! `finish()`. Dropping the writer before that removes the temporary file, so a
//! failed save never leaves a half-written CSV behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Writer};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::comments::CommentRecord;
use crate::error::SinkError;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column labels, in output order.
pub const HEADERS: [&str; 4] = ["Timestamp", "UserID", "Username", "CommentText"];

pub struct AtomicCsvWriter {
    writer: Writer<BufWriter<NamedTempFile>>,
    final_path: PathBuf,
}

impl AtomicCsvWriter {
    /// Create the temporary file in the destination's directory and write the BOM.
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let final_path = final_path.as_ref().to_path_buf();
        let parent_dir = match final_path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Err(SinkError::NoParent(final_path.clone())),
        };

        let temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|source| SinkError::Io { path: final_path.clone(), source })?;

        let mut buf_writer = BufWriter::new(temp_file);
        buf_writer
            .write_all(UTF8_BOM)
            .map_err(|source| SinkError::Io { path: final_path.clone(), source })?;

        Ok(Self { writer: Writer::from_writer(buf_writer), final_path })
    }

    pub fn write_record<I, T>(&mut self, record: I) -> Result<(), SinkError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .map_err(|source| SinkError::Csv { path: self.final_path.clone(), source })
    }

    /// Flush everything and atomically replace the destination.
    pub fn finish(self) -> Result<PathBuf, SinkError> {
        let Self { writer, final_path } = self;

        let buf_writer = writer
            .into_inner()
            .map_err(|e| SinkError::Io { path: final_path.clone(), source: std::io::Error::new(e.error().kind(), e.error().to_string()) })?;
        let named_temp = buf_writer
            .into_inner()
            .map_err(|e| SinkError::Io { path: final_path.clone(), source: std::io::Error::new(e.error().kind(), e.error().to_string()) })?;

        named_temp
            .persist(&final_path)
            .map_err(|e| SinkError::Io { path: final_path.clone(), source: e.error })?;

        Ok(final_path)
    }
}

/// Write `records` to `path` under the fixed header. Returns the row count.
#[instrument(skip(path, records), fields(path = %path.as_ref().display(), rows = records.len()))]
pub fn save_records(path: impl AsRef<Path>, records: &[CommentRecord]) -> Result<usize, SinkError> {
    let mut writer = AtomicCsvWriter::new(path.as_ref())?;
    writer.write_record(HEADERS)?;
    for r in records {
        writer.write_record([&r.timestamp, &r.user_id, &r.username, &r.text])?;
    }
    let written = writer.finish()?;
    debug!(path = %written.display(), "csv persisted");
    Ok(records.len())
}

/// Read a CSV file into its header and rows. A leading BOM is ignored and rows may
/// be shorter or longer than the header.
pub fn read_table(path: impl AsRef<Path>) -> Result<(StringRecord, Vec<StringRecord>), SinkError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| SinkError::Io { path: path.to_path_buf(), source })?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let csv_err = |source| SinkError::Csv { path: path.to_path_buf(), source };
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(body);
    let headers = reader.headers().map_err(csv_err)?.clone();
    let rows = reader.records().collect::<Result<Vec<_>, _>>().map_err(csv_err)?;
    Ok((headers, rows))
}

/// Read back a file written by [`save_records`].
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<CommentRecord>, SinkError> {
    let path = path.as_ref();
    let (headers, rows) = read_table(path)?;
    rows.iter()
        .map(|row| row.deserialize(Some(&headers)).map_err(|source| SinkError::Csv { path: path.to_path_buf(), source }))
        .collect()
}
