use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, instrument};

use crate::csv_sink::{read_table, AtomicCsvWriter};
use crate::discovery::FileDiscovery;
use crate::error::MergeError;

pub const KEY_USER: &str = "UserID";
pub const KEY_TIME: &str = "Timestamp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub files: usize,
    pub rows: usize,
    pub duplicates: usize,
    pub output: PathBuf,
}

/// Merge every CSV matching `pattern` into `output`, keeping the first row seen for
/// each (UserID, Timestamp) pair. Files are visited in sorted order.
///
/// The output header is the header of the last file read; rows from files with a
/// different layout, and ragged rows, are projected onto it by column name. Nothing
/// is written unless every input was read successfully.
#[instrument(skip(discovery), fields(root = %discovery.root().display()))]
pub fn merge_csv_files(discovery: &dyn FileDiscovery, pattern: &str, output: &str) -> Result<MergeSummary, MergeError> {
    let output_path = discovery.root().join(output);
    let files: Vec<PathBuf> = discovery
        .find(pattern)?
        .into_iter()
        .filter(|p| !same_file(p, &output_path))
        .collect();

    if files.is_empty() {
        return Err(MergeError::NoMatches(pattern.to_string()));
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    // Each kept row with the header it was read under
    let mut kept: Vec<(usize, StringRecord)> = Vec::new();
    let mut headers: Vec<StringRecord> = Vec::with_capacity(files.len());
    let mut duplicates = 0usize;

    for file in &files {
        let (header, rows) = read_table(file)?;
        let user_col = column(&header, KEY_USER, file)?;
        let time_col = column(&header, KEY_TIME, file)?;
        let header_idx = headers.len();
        headers.push(header);

        for row in rows {
            let key = (
                row.get(user_col).unwrap_or_default().to_string(),
                row.get(time_col).unwrap_or_default().to_string(),
            );
            if seen.insert(key) {
                kept.push((header_idx, row));
            } else {
                duplicates += 1;
            }
        }
        debug!(file = %file.display(), kept = kept.len(), duplicates, "merged file");
    }

    let Some(out_header) = headers.last() else {
        return Err(MergeError::NoMatches(pattern.to_string()));
    };

    let mut writer = AtomicCsvWriter::new(&output_path)?;
    writer.write_record(out_header)?;
    for (header_idx, row) in &kept {
        let header = &headers[*header_idx];
        if header == out_header && row.len() == out_header.len() {
            writer.write_record(row)?;
        } else {
            writer.write_record(project(row, header, out_header))?;
        }
    }
    let output = writer.finish()?;

    info!(files = files.len(), rows = kept.len(), duplicates, "merge complete");
    Ok(MergeSummary { files: files.len(), rows: kept.len(), duplicates, output })
}

fn column(header: &StringRecord, name: &'static str, path: &Path) -> Result<usize, MergeError> {
    header
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| MergeError::MissingColumn { path: path.to_path_buf(), column: name })
}

/// Reorder `row` (laid out under `from`) into the columns of `to`. Absent columns,
/// including the tail of a short row, are empty; extra trailing fields are dropped.
fn project<'a>(row: &'a StringRecord, from: &StringRecord, to: &StringRecord) -> Vec<&'a str> {
    to.iter()
        .map(|name| {
            from.iter()
                .position(|h| h == name)
                .and_then(|i| row.get(i))
                .unwrap_or("")
        })
        .collect()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
