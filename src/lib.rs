//! shepherd - supervisor for a long-running batch downloader.
//!
//! Restarts the downloader after crashes, tracks per-item consecutive
//! failures, prunes completed or permanently-failing items from the
//! work-queue file, and stops when the downloader reports the batch done.
//!
//! # Architecture
//!
//! - [`config`] - immutable loop configuration with TOML/CLI overrides
//! - [`error`] - custom error types and classification
//! - [`interpret`] - pure line-to-events interpretation of child output
//! - [`ledger`] - in-memory consecutive-failure accounting
//! - [`queue`] - work-queue file rewriting
//! - [`audit`] - append-only removal log
//! - [`supervisor`] - the restart loop and per-run state machine
//! - [`cleanup`] - optional self-destruct after batch completion
//!
//! The supervisor performs no network I/O and never inspects URLs; the
//! downloader is a black box reached only through its output stream, its
//! exit status, and the shared queue file.

pub mod audit;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod interpret;
pub mod ledger;
pub mod queue;
pub mod supervisor;

// Re-export commonly used types
pub use audit::{RemovalEntry, RemovalLog};
pub use config::MonitorConfig;
pub use error::{Result, ShepherdError};
pub use interpret::{LogEvent, LogInterpreter};
pub use ledger::FailureLedger;
pub use queue::QueueFile;
pub use supervisor::{ExitReason, RunOutcome, Supervisor};
