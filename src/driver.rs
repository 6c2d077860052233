//! Batch conversion of captured dumps and the top-level dispatch between
//! conversion and merging.
//!
//! All filesystem access goes through [`FileDiscovery`] and every question through
//! [`Confirm`], so both flows run unchanged against scripted collaborators in tests.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::comments::{map_payload, CommentRecord, MappedPayload};
use crate::config::{AppConfig, DISPATCH_PATTERN, INPUT_PATTERN, OUTPUT_PREFIX};
use crate::csv_sink::save_records;
use crate::discovery::{display_name, FileDiscovery};
use crate::error::{ConvertError, DiscoveryError, MergeError, RunError};
use crate::merge::{merge_csv_files, MergeSummary};
use crate::prompt::Confirm;

pub const PREVIEW_RECORDS: usize = 3;
pub const PREVIEW_CHARS: usize = 100;
const RULE_WIDTH: usize = 80;

pub const PROCESS_QUESTION: &str = "Process these files?";
pub const DELETE_QUESTION: &str = "Delete these original files?";

/// Result of converting one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub comments: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub discovered: usize,
    pub converted: Vec<FileOutcome>,
    /// Files whose conversion failed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    pub deleted: usize,
    pub cancelled: bool,
}

impl ConversionSummary {
    pub fn processed(&self) -> usize {
        self.converted.len()
    }

    pub fn comments(&self) -> usize {
        self.converted.iter().map(|f| f.comments).sum()
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Converted(ConversionSummary),
    Merged(MergeSummary),
    NothingToDo,
}

/// Output name for an input: the text between `main_` and `.json`, or the 1-based
/// position among successfully converted files when the name has no such part.
pub fn output_name(input: &Path, processed_so_far: usize) -> String {
    let suffix = input
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("main_"))
        .and_then(|n| n.strip_suffix(".json"))
        .map(str::to_string)
        .unwrap_or_else(|| (processed_so_far + 1).to_string());
    format!("{}{}.csv", OUTPUT_PREFIX, suffix)
}

/// First `PREVIEW_CHARS` characters of `text`, with `...` when truncated.
pub fn preview_text(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn print_preview(records: &[CommentRecord]) {
    println!("\nPreview:");
    println!("{}", "=".repeat(RULE_WIDTH));
    for (idx, r) in records.iter().take(PREVIEW_RECORDS).enumerate() {
        println!("{}. [{}] {}({}):", idx + 1, r.timestamp, r.username, r.user_id);
        println!("{}", preview_text(&r.text));
        println!("{}", "-".repeat(RULE_WIDTH));
    }
}

pub struct Converter<'a> {
    config: &'a AppConfig,
    discovery: &'a dyn FileDiscovery,
    confirm: &'a mut dyn Confirm,
}

impl<'a> Converter<'a> {
    pub fn new(config: &'a AppConfig, discovery: &'a dyn FileDiscovery, confirm: &'a mut dyn Confirm) -> Self {
        Self { config, discovery, confirm }
    }

    /// Convert one file to its CSV. `processed_so_far` feeds the fallback output name.
    #[instrument(skip(self), fields(file = %input.display()))]
    pub fn convert_file(&self, input: &Path, processed_so_far: usize) -> Result<(FileOutcome, Vec<CommentRecord>), ConvertError> {
        let text = self
            .discovery
            .read(input)
            .map_err(|source| ConvertError::Read { path: input.to_path_buf(), source })?;

        let MappedPayload { objects, records } = map_payload(&text, self.config.strategy, self.config.time_format);
        drop(text);
        if objects == 0 {
            return Err(ConvertError::NoJsonObjects);
        }
        if records.is_empty() {
            return Err(ConvertError::NoComments);
        }

        let output = self.discovery.root().join(output_name(input, processed_so_far));
        let comments = save_records(&output, &records)?;
        println!("Saved {} comments to {}", comments, display_name(&output));

        Ok((FileOutcome { input: input.to_path_buf(), output, comments }, records))
    }

    /// Discover, confirm, convert every file, then offer to delete the originals.
    pub fn run_conversion(&mut self) -> Result<ConversionSummary, DiscoveryError> {
        let files = self.discovery.find(INPUT_PATTERN)?;
        let mut summary = ConversionSummary { discovered: files.len(), ..Default::default() };

        if files.is_empty() {
            println!("No {} files found in {}", INPUT_PATTERN, self.discovery.root().display());
            println!("Operation cancelled");
            summary.cancelled = true;
            return Ok(summary);
        }

        println!("Found {} data files:", files.len());
        for f in &files {
            println!("  - {}", display_name(f));
        }
        if !self.confirm.confirm(PROCESS_QUESTION) {
            println!("Operation cancelled");
            summary.cancelled = true;
            return Ok(summary);
        }

        for file in &files {
            println!("\nProcessing file: {}", display_name(file));
            match self.convert_file(file, summary.processed()) {
                Ok((outcome, records)) => {
                    print_preview(&records);
                    summary.converted.push(outcome);
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "file skipped");
                    eprintln!("{}", e);
                    summary.failed.push((file.clone(), e.to_string()));
                }
            }
        }

        println!("\nConversion complete! Processed {}/{} files", summary.processed(), files.len());
        println!("Converted {} comments in total", summary.comments());

        summary.deleted = self.cleanup()?;
        Ok(summary)
    }

    /// List the original dumps and delete them after a separate confirmation.
    /// Returns how many were deleted.
    pub fn cleanup(&mut self) -> Result<usize, DiscoveryError> {
        let files = self.discovery.find(INPUT_PATTERN)?;
        if files.is_empty() {
            return Ok(0);
        }

        println!("\nOriginal files:");
        for f in &files {
            println!("  - {}", display_name(f));
        }
        if !self.confirm.confirm(DELETE_QUESTION) {
            return Ok(0);
        }

        let mut deleted = 0;
        for f in &files {
            match self.discovery.remove(f) {
                Ok(()) => {
                    println!("Deleted: {}", display_name(f));
                    deleted += 1;
                }
                Err(e) => println!("Failed to delete {}: {}", display_name(f), e),
            }
        }
        println!("Deleted {}/{} files", deleted, files.len());
        Ok(deleted)
    }
}

/// Run the merge with the configured pattern and output, printing the result.
pub fn run_merge(config: &AppConfig, discovery: &dyn FileDiscovery) -> Result<MergeSummary, MergeError> {
    match merge_csv_files(discovery, &config.merge_pattern, &config.merge_output) {
        Ok(summary) => {
            println!(
                "Merged {} files -> {} ({} unique rows)",
                summary.files,
                display_name(&summary.output),
                summary.rows
            );
            println!("Merge complete");
            Ok(summary)
        }
        Err(e) => {
            eprintln!("Merge failed: {}", e);
            println!("Merge ran into a problem");
            Err(e)
        }
    }
}

/// Convert when any `main*.json` exists, else merge when any merge input exists,
/// else report that there is nothing to do.
pub fn run(config: &AppConfig, discovery: &dyn FileDiscovery, confirm: &mut dyn Confirm) -> Result<RunOutcome, RunError> {
    if !discovery.find(DISPATCH_PATTERN)?.is_empty() {
        info!("dump files present, running conversion");
        let summary = Converter::new(config, discovery, confirm).run_conversion()?;
        return Ok(RunOutcome::Converted(summary));
    }

    if !discovery.find(&config.merge_pattern)?.is_empty() {
        info!("csv files present, running merge");
        return Ok(RunOutcome::Merged(run_merge(config, discovery)?));
    }

    println!("No {} or {} files found", DISPATCH_PATTERN, config.merge_pattern);
    Ok(RunOutcome::NothingToDo)
}
