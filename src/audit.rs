//! Removal audit logging.
//!
//! When an item exhausts its failure budget it disappears from the queue
//! file; this log is the only record of why. Entries are appended as
//! timestamped plain-text blocks carrying the identifier, a one-line
//! reason, and the full transcript of the final failing run. The format is
//! byte-compatible with existing `removed.txt` files.

use crate::error::{Result, ShepherdError};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// One removal record: who was evicted, when, why, and what the
/// downloader printed while failing.
#[derive(Debug, Clone)]
pub struct RemovalEntry {
    /// When the eviction happened
    pub timestamp: DateTime<Local>,
    /// The removed identifier (URL)
    pub item: String,
    /// One-line summary (failure count and last exit status)
    pub reason: String,
    /// Transcript of the final failing run
    pub transcript: String,
}

impl RemovalEntry {
    /// Create an entry stamped with the current local time
    pub fn new(
        item: impl Into<String>,
        reason: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            item: item.into(),
            reason: reason.into(),
            transcript: transcript.into(),
        }
    }
}

/// Append-only audit log of permanently removed items.
#[derive(Debug, Clone)]
pub struct RemovalLog {
    path: PathBuf,
}

impl RemovalLog {
    /// Create a log handle for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one removal block, creating the file if needed.
    pub fn append(&self, entry: &RemovalEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ShepherdError::audit(&self.path, format!("open failed: {e}")))?;

        writeln!(
            file,
            "[{}] URL: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.item
        )
        .and_then(|()| writeln!(file, "          Reason: {}", entry.reason))
        .and_then(|()| {
            writeln!(
                file,
                "--- Full Log ---\n{}\n--- End Log ---\n",
                entry.transcript.trim()
            )
        })
        .map_err(|e| ShepherdError::audit(&self.path, format!("write failed: {e}")))?;

        info!(
            "Logged removed item '{}' to '{}'",
            entry.item,
            self.path.display()
        );
        Ok(())
    }

    /// Parse the identifiers recorded in the log, in file order.
    ///
    /// An absent log means nothing has been removed yet.
    pub fn read_items(&self) -> Result<Vec<String>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ShepherdError::audit(&self.path, format!("read failed: {e}")))?;

        let items = content
            .lines()
            .filter(|line| line.starts_with('['))
            .filter_map(|line| line.split_once("] URL: "))
            .map(|(_, item)| item.trim().to_string())
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_in_temp() -> (RemovalLog, TempDir) {
        let temp = TempDir::new().unwrap();
        (RemovalLog::new(temp.path().join("removed.txt")), temp)
    }

    #[test]
    fn test_append_writes_block_format() {
        let (log, _temp) = log_in_temp();
        let entry = RemovalEntry::new(
            "https://a.example/x",
            "Failed 5 times. Last exit code: 1.",
            "--> Downloading: https://a.example/x\nerror: reset\n",
        );
        log.append(&entry).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("] URL: https://a.example/x"));
        assert!(content.contains("          Reason: Failed 5 times. Last exit code: 1."));
        assert!(content.contains("--- Full Log ---"));
        assert!(content.contains("error: reset"));
        assert!(content.contains("--- End Log ---"));
        // Transcript is trimmed inside the block
        assert!(!content.contains("reset\n\n--- End Log ---"));
    }

    #[test]
    fn test_append_is_append_only() {
        let (log, _temp) = log_in_temp();
        log.append(&RemovalEntry::new("A", "r1", "t1")).unwrap();
        log.append(&RemovalEntry::new("B", "r2", "t2")).unwrap();

        let items = log.read_items().unwrap();
        assert_eq!(items, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_read_items_missing_file() {
        let (log, _temp) = log_in_temp();
        assert!(log.read_items().unwrap().is_empty());
    }

    #[test]
    fn test_read_items_skips_transcript_lines() {
        let (log, _temp) = log_in_temp();
        // A transcript that itself contains a URL-looking line must not
        // leak into the parsed identifiers.
        let entry = RemovalEntry::new("A", "r", "fetching URL: decoy\nmore output");
        log.append(&entry).unwrap();

        assert_eq!(log.read_items().unwrap(), vec!["A".to_string()]);
    }
}
