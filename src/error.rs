use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("No valid JSON objects found")]
    NoJsonObjects,
    #[error("No valid comments extracted")]
    NoComments,
    #[error("Save failed: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("CSV error on {path}: {source}")]
    Csv { path: PathBuf, #[source] source: csv::Error },
    #[error("Cannot determine parent directory for: {0}")]
    NoParent(PathBuf),
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("No files found to merge matching '{0}'")]
    NoMatches(String),
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Merge failed: {0}")]
    Sink(#[from] SinkError),
    #[error("File discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern { pattern: String, #[source] source: glob::PatternError },
    #[error("Cannot read directory entry: {0}")]
    Entry(#[from] glob::GlobError),
}

/// Why a single reply was skipped by the mapper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing field '{path}'")]
    Missing { path: String },
    #[error("field '{path}' is not {expected}")]
    WrongType { path: String, expected: &'static str },
}

impl FieldError {
    pub fn path(&self) -> &str {
        match self {
            FieldError::Missing { path } | FieldError::WrongType { path, .. } => path,
        }
    }
}
