//! Self-destruct cleanup.
//!
//! Optional terminal step: once the batch has completed and the queue file
//! holds nothing but blank lines, there is no reason for the downloader
//! script, the queue file, or the supervisor binary to stick around. Each
//! deletion is logged; any failure aborts with an error so the operator
//! knows the cleanup is incomplete.

use crate::config::MonitorConfig;
use crate::error::{Result, ShepherdError};
use crate::queue::QueueFile;
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Delete the queue file, the downloader script, and the running
/// executable, provided the queue is empty or blank. A non-blank queue
/// leaves everything in place.
pub fn self_destruct(config: &MonitorConfig) -> Result<()> {
    let own_exe = std::env::current_exe()
        .map_err(|e| ShepherdError::cleanup("<self>", format!("cannot resolve own path: {e}")))?;
    run_self_destruct(config, &own_exe)
}

fn run_self_destruct(config: &MonitorConfig, own_exe: &Path) -> Result<()> {
    let queue = QueueFile::new(&config.queue_path);
    if !queue.is_empty_or_blank() {
        info!(
            "Queue file '{}' still has entries, leaving files in place",
            config.queue_path.display()
        );
        return Ok(());
    }

    println!(
        "{} queue is empty, commencing self-destruct sequence",
        "Cleanup:".yellow().bold()
    );

    if config.queue_path.is_file() {
        remove("queue file", &config.queue_path)?;
    }
    remove("downloader script", &config.script_path)?;
    remove("supervisor binary", own_exe)?;
    println!("{} Goodbye!", "Cleanup:".yellow().bold());
    Ok(())
}

fn remove(what: &str, path: &Path) -> Result<()> {
    info!("Deleting {what} '{}'", path.display());
    std::fs::remove_file(path).map_err(|e| ShepherdError::cleanup(path, e.to_string()))
}
