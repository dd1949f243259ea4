//! Custom error types for shepherd.
//!
//! This module provides structured error types that let the supervision
//! loop distinguish fatal conditions (missing script, broken config) from
//! best-effort file operations that should never abort the loop.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for shepherd operations
#[derive(Error, Debug)]
pub enum ShepherdError {
    /// The downloader script to supervise does not exist
    #[error("Downloader script not found: {path}")]
    MissingScript { path: PathBuf },

    /// Failed to load or validate configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Queue file could not be read or rewritten
    #[error("Queue file error ({path}): {message}")]
    Queue { path: PathBuf, message: String },

    /// Removal audit log could not be written or parsed
    #[error("Audit log error ({path}): {message}")]
    Audit { path: PathBuf, message: String },

    /// Child process could not be spawned or waited on
    #[error("Downloader process error: {message}")]
    Child { message: String },

    /// Self-destruct cleanup failed to delete a file
    #[error("Cleanup failed for {path}: {message}")]
    Cleanup { path: PathBuf, message: String },

    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShepherdError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a queue file error
    pub fn queue(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Queue {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an audit log error
    pub fn audit(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Audit {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a child process error
    pub fn child(message: impl Into<String>) -> Self {
        Self::Child {
            message: message.into(),
        }
    }

    /// Create a cleanup error
    pub fn cleanup(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Cleanup {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is recoverable inside the restart loop.
    ///
    /// Queue and audit file failures are best-effort: the loop reports
    /// them and keeps supervising. Everything else aborts the supervisor,
    /// which exits with status 1.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Queue { .. } | Self::Audit { .. })
    }
}

/// Type alias for shepherd results
pub type Result<T> = std::result::Result<T, ShepherdError>;
