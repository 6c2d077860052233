use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, instrument, warn};

use crate::error::DiscoveryError;

/// Everything the driver needs from the filesystem.
///
/// `read` and `remove` default to `std::fs`; override them to simulate failures.
pub trait FileDiscovery: Debug {
    /// Directory that patterns are resolved against and outputs are written to.
    fn root(&self) -> &Path;

    /// Files in `root` whose names match `pattern`, sorted.
    fn find(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError>;

    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Glob-backed discovery rooted at one directory.
#[derive(Debug, Clone)]
pub struct GlobDiscovery {
    root: PathBuf,
}

impl GlobDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileDiscovery for GlobDiscovery {
    fn root(&self) -> &Path {
        &self.root
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn find(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        // The root may contain glob metacharacters of its own
        let escaped_root = Pattern::escape(&self.root.to_string_lossy());
        let full = Path::new(&escaped_root).join(pattern);
        let full = full.to_string_lossy();

        let entries = glob::glob(&full)
            .map_err(|source| DiscoveryError::Pattern { pattern: pattern.to_string(), source })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "unreadable entry while globbing");
                    return Err(DiscoveryError::Entry(e));
                }
            }
        }
        paths.sort();
        debug!(count = paths.len(), "matched files");
        Ok(paths)
    }
}

/// File name for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
