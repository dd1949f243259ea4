//! The supervision loop.
//!
//! One long-lived supervisor drives one downloader child at a time:
//! spawn, interpret its merged output, analyze the exit, prune the queue,
//! sleep, repeat. The loop terminates when the child announces batch
//! completion or the operator interrupts.
//!
//! State machine per run: Starting -> Running -> Analyzing -> Cleanup.
//! [`Supervisor::run_once`] is one full pass; [`Supervisor::run`] wraps it
//! in the restart loop with the fixed inter-run delay.

mod stream;

use crate::audit::{RemovalEntry, RemovalLog};
use crate::config::MonitorConfig;
use crate::error::{Result, ShepherdError};
use crate::interpret::{LogEvent, LogInterpreter};
use crate::ledger::FailureLedger;
use crate::queue::QueueFile;
use colored::Colorize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Why the restart loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The downloader printed the batch-complete marker
    BatchComplete,
    /// The operator interrupted; pending removals were flushed
    Interrupted,
}

/// Result of one downloader run, consumed synchronously by the caller.
#[derive(Debug)]
pub struct RunOutcome {
    /// Child exit status (-1 when killed by a signal)
    pub exit_status: i32,
    /// Item in flight when the stream ended, if any
    pub last_item: Option<String>,
    /// Whether the batch-complete marker was seen this run
    pub batch_finished: bool,
    /// Whether the run was cut short by an operator interrupt
    pub interrupted: bool,
    /// Identifiers pruned from the queue this run (successes plus
    /// threshold evictions). Empty when the queue rewrite failed: a
    /// listed identifier is guaranteed to be gone from the file.
    pub removed: Vec<String>,
}

/// Supervisor for the batch downloader.
///
/// Owns the failure ledger, which persists across downloader restarts but
/// not across supervisor restarts.
#[derive(Debug)]
pub struct Supervisor {
    config: MonitorConfig,
    ledger: FailureLedger,
    queue: QueueFile,
    audit: RemovalLog,
}

impl Supervisor {
    /// Create a supervisor for the given configuration
    pub fn new(config: MonitorConfig) -> Self {
        let queue = QueueFile::new(&config.queue_path);
        let audit = RemovalLog::new(&config.audit_path);
        Self {
            config,
            ledger: FailureLedger::new(),
            queue,
            audit,
        }
    }

    /// Failure ledger, for inspection
    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Run the restart loop until batch completion or interruption.
    ///
    /// Fatal up front if the downloader script is missing. Each pass of
    /// the loop is one child lifetime; a fixed delay separates restarts so
    /// a crashing child cannot spin hot.
    pub async fn run(&mut self) -> Result<ExitReason> {
        if !self.config.script_path.is_file() {
            return Err(ShepherdError::MissingScript {
                path: self.config.script_path.clone(),
            });
        }

        self.print_banner();

        // Registered once for the whole loop so a Ctrl-C arriving between
        // runs or during the restart delay is never dropped
        let mut interrupt = Box::pin(tokio::signal::ctrl_c());

        loop {
            let outcome = self.run_once().await?;

            if outcome.interrupted {
                println!(
                    "\n{} Monitor stopped by user. Exiting.",
                    "Interrupted:".yellow().bold()
                );
                return Ok(ExitReason::Interrupted);
            }

            if outcome.batch_finished {
                println!(
                    "\n{} All downloads finished, stopping the monitor.",
                    "Done:".green().bold()
                );
                if self.config.self_destruct {
                    crate::cleanup::self_destruct(&self.config)?;
                }
                return Ok(ExitReason::BatchComplete);
            }

            info!(
                "'{}' stopped (exit status {}), restarting in {}s",
                self.config.script_path.display(),
                outcome.exit_status,
                self.config.restart_delay_secs
            );
            tokio::select! {
                () = tokio::time::sleep(self.config.restart_delay()) => {}
                _ = &mut interrupt => {
                    println!(
                        "\n{} Monitor stopped by user. Exiting.",
                        "Interrupted:".yellow().bold()
                    );
                    return Ok(ExitReason::Interrupted);
                }
            }
        }
    }

    /// One full pass of the state machine: spawn the downloader, consume
    /// its merged output, analyze the exit, prune the queue.
    ///
    /// Exposed separately from [`run`](Self::run) so a single child
    /// lifetime can be driven without the unbounded restart loop.
    pub async fn run_once(&mut self) -> Result<RunOutcome> {
        let shell = which::which("bash")
            .map_err(|e| ShepherdError::child(format!("cannot locate bash: {e}")))?;

        info!("Starting '{}'", self.config.script_path.display());
        let mut child = Command::new(shell)
            .arg(&self.config.script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ShepherdError::child(format!(
                    "failed to spawn '{}': {e}",
                    self.config.script_path.display()
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ShepherdError::child("child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ShepherdError::child("child stderr not captured"))?;
        let mut lines = stream::merge_output(stdout, stderr);

        let mut interp = LogInterpreter::new(&self.config)?;
        let mut completed: Vec<String> = Vec::new();
        let mut interrupted = false;

        // Registered once, outside the loop: a fresh ctrl_c() per select
        // iteration would drop a SIGINT delivered while a line is being
        // processed
        let mut interrupt = Box::pin(tokio::signal::ctrl_c());

        // Running: the single suspension point is "next line or EOF"
        loop {
            tokio::select! {
                maybe_line = lines.recv() => {
                    let Some(line) = maybe_line else { break };
                    println!("{line}");
                    for event in interp.observe(&line) {
                        match event {
                            LogEvent::ItemStarted(id) => {
                                info!("Now monitoring progress for: {id}");
                            }
                            LogEvent::ItemCompleted(id) => {
                                debug!("Download complete for {id}, queuing for removal");
                                self.ledger.record_success(&id);
                                if !completed.contains(&id) {
                                    completed.push(id);
                                }
                            }
                            LogEvent::BatchCompleted => {
                                println!(
                                    "\n{}",
                                    "--- Completion Message Detected ---".green()
                                );
                            }
                        }
                    }
                    // Terminal marker: stop consuming without waiting for EOF
                    if interp.is_finished() {
                        break;
                    }
                }
                _ = &mut interrupt => {
                    // The child is terminated rather than orphaned; pending
                    // removals are still flushed below.
                    warn!("Interrupt received, terminating downloader");
                    interrupted = true;
                    if let Err(e) = child.start_kill() {
                        warn!("Could not kill downloader: {e}");
                    }
                    break;
                }
            }
        }
        drop(lines);

        // Analyzing: combine exit status with the last-known item
        let status = child
            .wait()
            .await
            .map_err(|e| ShepherdError::child(format!("wait failed: {e}")))?;
        let exit_status = status.code().unwrap_or(-1);

        if !interrupted {
            self.analyze_failure(&interp, exit_status, &mut completed);
        }

        // Cleanup: queue mutation only after the child has fully exited.
        // Also the flush path on interruption.
        let mut removed = Vec::new();
        if !completed.is_empty() {
            match self.queue.remove_matching(&completed) {
                Ok(_) => removed = completed,
                Err(e) if e.is_recoverable() => {
                    // Best effort: the queue keeps its prior contents, the
                    // loop carries on, and nothing is reported as removed
                    warn!("Queue update failed: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(RunOutcome {
            exit_status,
            last_item: interp.current_item().map(str::to_string),
            batch_finished: interp.is_finished(),
            interrupted,
            removed,
        })
    }

    /// Post-exit failure accounting. A non-zero exit with an item still in
    /// flight means the downloader died mid-item; count it, and at the
    /// threshold evict the item through the same removal path a success
    /// takes.
    fn analyze_failure(
        &mut self,
        interp: &LogInterpreter,
        exit_status: i32,
        completed: &mut Vec<String>,
    ) {
        if exit_status == 0 {
            return;
        }
        let Some(item) = interp.current_item().map(str::to_string) else {
            // Died between items or after a clean completion: nothing to
            // attribute the failure to
            return;
        };

        let count = self.ledger.record_failure(&item);
        println!(
            "\n{} exit status {exit_status} while processing {item} ({count}/{} failures)",
            "Failure:".red().bold(),
            self.config.max_failures
        );

        if count >= self.config.max_failures {
            println!(
                "{} {item} reached the failure limit and will be removed",
                "Evicting:".red().bold()
            );
            let reason = format!("Failed {count} times. Last exit code: {exit_status}.");
            let entry = RemovalEntry::new(item.clone(), reason, interp.transcript_text());
            if let Err(e) = self.audit.append(&entry) {
                // Best effort: losing the audit record must not keep a
                // dead item in the queue
                warn!("Audit log write failed: {e}");
            }
            if !completed.contains(&item) {
                completed.push(item.clone());
            }
            self.ledger.clear(&item);
        }
    }

    fn print_banner(&self) {
        println!("{}", "-".repeat(40).bright_blue());
        println!("{}", "  shepherd - downloader monitor".bright_blue().bold());
        println!("{}", "-".repeat(40).bright_blue());
        println!("   Script: {}", self.config.script_path.display());
        println!("   Queue:  {}", self.config.queue_path.display());
        println!("   Max failures per item: {}", self.config.max_failures);
        println!("   Stops on: '{}'", self.config.success_marker);
        println!("   Press Ctrl+C to stop the monitor.");
        println!();
    }
}
