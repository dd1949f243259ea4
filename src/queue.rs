//! Work-queue file editing.
//!
//! The queue is a plain text file with one URL per line, owned by the
//! downloader while it runs. The supervisor only rewrites it between runs,
//! after the child has fully exited, so the child never sees a torn write.

use crate::error::{Result, ShepherdError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Editor for the newline-delimited work-queue file.
#[derive(Debug, Clone)]
pub struct QueueFile {
    path: PathBuf,
}

impl QueueFile {
    /// Create an editor for the queue file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove every line that contains any of `ids` as a substring, and
    /// rewrite the file in full. Returns the number of lines dropped.
    ///
    /// Matching is substring containment, not exact-line equality, so
    /// surrounding whitespace in the file never defeats a match. The
    /// flip side is collateral removal: if one queued identifier is a
    /// substring of another, both lines go. That semantics is kept for
    /// compatibility with existing queue files.
    ///
    /// A missing file is a warning, not an error, and removal of an
    /// identifier that is already absent leaves the file unchanged.
    pub fn remove_matching(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        if !self.path.is_file() {
            warn!(
                "Queue file '{}' not found, nothing to remove",
                self.path.display()
            );
            return Ok(0);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ShepherdError::queue(&self.path, format!("read failed: {e}")))?;

        let mut kept = String::with_capacity(content.len());
        let mut removed = 0usize;
        for line in content.split_inclusive('\n') {
            if ids.iter().any(|id| line.contains(id.as_str())) {
                removed += 1;
            } else {
                kept.push_str(line);
            }
        }

        if removed == 0 {
            return Ok(0);
        }

        std::fs::write(&self.path, kept)
            .map_err(|e| ShepherdError::queue(&self.path, format!("rewrite failed: {e}")))?;

        info!(
            "Updated '{}': removed {} line(s)",
            self.path.display(),
            removed
        );
        Ok(removed)
    }

    /// Whether the queue file is absent or contains only blank lines.
    ///
    /// A read error reports the file as non-empty: the self-destruct path
    /// must never delete files on the strength of a failed read.
    pub fn is_empty_or_blank(&self) -> bool {
        if !self.path.is_file() {
            return true;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(content) => content.lines().all(|line| line.trim().is_empty()),
            Err(e) => {
                warn!(
                    "Could not check queue file '{}': {e}; treating as non-empty",
                    self.path.display()
                );
                false
            }
        }
    }
}
