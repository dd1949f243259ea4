//! Configuration for the supervision loop.
//!
//! All knobs live in a single immutable [`MonitorConfig`] built at startup
//! and handed to the supervisor. Defaults match the historical constants;
//! an optional TOML file and CLI flags can override any field.

use crate::error::{Result, ShepherdError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default downloader script the supervisor runs
pub const DEFAULT_SCRIPT: &str = "bandcamp-dump";

/// Default work-queue file (one URL per line)
pub const DEFAULT_QUEUE_FILE: &str = "bandcamp-dump.lst";

/// Default audit log for permanently removed URLs
pub const DEFAULT_AUDIT_FILE: &str = "removed.txt";

/// Marker the downloader prints when it starts an item
pub const DEFAULT_START_MARKER: &str = "--> Downloading:";

/// Marker the downloader prints when the whole queue is done
pub const DEFAULT_SUCCESS_MARKER: &str = "--> All downloads finished.";

/// Consecutive failures before an item is evicted from the queue
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Seconds to wait between restarts of the downloader
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 15;

/// Immutable configuration for one supervisor run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Path to the downloader script to supervise
    pub script_path: PathBuf,
    /// Path to the newline-delimited work-queue file
    pub queue_path: PathBuf,
    /// Path to the append-only removal audit log
    pub audit_path: PathBuf,
    /// Line marker that announces a new item
    pub start_marker: String,
    /// Line marker that announces batch completion
    pub success_marker: String,
    /// Consecutive-failure threshold per item
    pub max_failures: u32,
    /// Delay between restart attempts, in seconds
    pub restart_delay_secs: u64,
    /// After batch completion with a blank queue, delete the queue file,
    /// the script, and the supervisor binary itself
    pub self_destruct: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            script_path: PathBuf::from(DEFAULT_SCRIPT),
            queue_path: PathBuf::from(DEFAULT_QUEUE_FILE),
            audit_path: PathBuf::from(DEFAULT_AUDIT_FILE),
            start_marker: DEFAULT_START_MARKER.to_string(),
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
            max_failures: DEFAULT_MAX_FAILURES,
            restart_delay_secs: DEFAULT_RESTART_DELAY_SECS,
            self_destruct: false,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from an optional TOML file.
    ///
    /// `None` yields the defaults. A path that does not exist or does not
    /// parse is a configuration error: an explicitly requested config file
    /// must not be silently ignored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            ShepherdError::config_with_path(
                format!("failed to read config file: {e}"),
                path.to_path_buf(),
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            ShepherdError::config_with_path(format!("invalid TOML: {e}"), path.to_path_buf())
        })
    }

    /// Validate field values before the loop starts.
    pub fn validate(&self) -> Result<()> {
        if self.max_failures == 0 {
            return Err(ShepherdError::config("max_failures must be at least 1"));
        }
        if self.start_marker.trim().is_empty() {
            return Err(ShepherdError::config("start_marker must not be empty"));
        }
        if self.success_marker.trim().is_empty() {
            return Err(ShepherdError::config("success_marker must not be empty"));
        }
        Ok(())
    }

    /// Restart delay as a [`Duration`]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}
