//! shepherd - supervisor for a long-running batch downloader.
//!
//! Watches a downloader script, restarts it when it crashes, and prunes
//! finished or repeatedly failing items from its work-queue file.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use shepherd::{ExitReason, MonitorConfig, RemovalLog, Supervisor};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shepherd")]
#[command(version = "0.1.0")]
#[command(about = "Supervise a batch downloader: restart on crash, prune dead work items", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the supervision loop (the default when no subcommand is given)
    Run(RunArgs),

    /// List identifiers recorded in the removal audit log
    Removed {
        /// Audit log path override
        #[arg(long)]
        audit: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Downloader script to supervise
    #[arg(long)]
    script: Option<PathBuf>,

    /// Work-queue file (one URL per line)
    #[arg(long)]
    queue: Option<PathBuf>,

    /// Removal audit log path
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Consecutive failures before an item is evicted
    #[arg(long)]
    max_failures: Option<u32>,

    /// Seconds to wait between restarts
    #[arg(long)]
    restart_delay: Option<u64>,

    /// After batch completion with a blank queue, delete the queue file,
    /// the script, and this binary
    #[arg(long)]
    self_destruct: bool,
}

impl RunArgs {
    fn apply(self, config: &mut MonitorConfig) {
        if let Some(script) = self.script {
            config.script_path = script;
        }
        if let Some(queue) = self.queue {
            config.queue_path = queue;
        }
        if let Some(audit) = self.audit {
            config.audit_path = audit;
        }
        if let Some(max_failures) = self.max_failures {
            config.max_failures = max_failures;
        }
        if let Some(restart_delay) = self.restart_delay {
            config.restart_delay_secs = restart_delay;
        }
        if self.self_destruct {
            config.self_destruct = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "shepherd=debug,info"
    } else {
        "shepherd=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = match MonitorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            args.apply(&mut config);
            if let Err(e) = config.validate() {
                eprintln!("{} {e}", "Error:".red().bold());
                std::process::exit(1);
            }

            let mut supervisor = Supervisor::new(config);
            match supervisor.run().await {
                // Interruption is a normal stop, not an error
                Ok(ExitReason::BatchComplete | ExitReason::Interrupted) => {}
                Err(e) => {
                    eprintln!("{} {e}", "Error:".red().bold());
                    std::process::exit(1);
                }
            }
        }
        Commands::Removed { audit } => {
            let log = RemovalLog::new(audit.unwrap_or(config.audit_path));
            match log.read_items() {
                Ok(items) if items.is_empty() => {
                    println!("No removals recorded in '{}'", log.path().display());
                }
                Ok(items) => {
                    for item in items {
                        println!("{item}");
                    }
                }
                Err(e) => {
                    eprintln!("{} {e}", "Error:".red().bold());
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
