//! refdedup - remove files from a target tree that already exist in a
//! reference tree.
//!
//! Usage:
//!   refdedup REFERENCE TARGET           Dry run: report what would be deleted
//!   refdedup REFERENCE TARGET --live    Delete duplicates after confirmation
//!   refdedup --help                     Show help

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use refdedup_core::{
    DedupConfig, DedupEvent, DeleteMethod, RunMode, RunState, RunStatus, RunSummary,
};
use refdedup_ops::{ConfirmRequest, Deduplicator, EventReceiver};

const EXIT_FILE_ERRORS: u8 = 2;

#[derive(Parser)]
#[command(
    name = "refdedup",
    version,
    about = "Remove files from a target tree that duplicate a reference tree",
    long_about = "refdedup deletes files from TARGET that exist in REFERENCE at the same \
                  relative path with identical content.\n\n\
                  The reference tree is never modified. Runs are dry by default; pass \
                  --live to delete."
)]
struct Cli {
    /// Reference tree (never modified)
    reference: PathBuf,

    /// Tree to remove duplicates from
    target: PathBuf,

    /// Report what would be deleted without touching the filesystem (default)
    #[arg(long, conflicts_with = "live")]
    dry_run: bool,

    /// Delete duplicates from the target tree
    #[arg(long)]
    live: bool,

    /// Skip the confirmation prompt in live mode
    #[arg(short, long)]
    yes: bool,

    /// Print every file as it is scanned
    #[arg(short, long)]
    verbose: bool,

    /// Hashing threads (0 = all cores, 1 = sequential)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// Move duplicates to the system trash instead of unlinking them
    #[arg(long)]
    trash: bool,

    /// Keep directories emptied by deletions
    #[arg(long)]
    no_prune: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = DedupConfig::builder()
        .reference_root(cli.reference)
        .target_root(cli.target)
        .mode(if cli.live && !cli.dry_run { RunMode::Live } else { RunMode::DryRun })
        .verbose(cli.verbose)
        .threads(cli.threads)
        .delete_method(if cli.trash {
            DeleteMethod::Trash
        } else {
            DeleteMethod::Permanent
        })
        .prune_empty_dirs(!cli.no_prune)
        .build()
        .wrap_err("Invalid arguments")?;

    let dedup = Deduplicator::new(config);

    // The printer signals once it has rendered everything up to the
    // confirmation gate. Without a printer the sender is dropped and the
    // wait returns at once.
    let (ready_tx, ready_rx) = mpsc::channel();
    let printer = (cli.format == OutputFormat::Text).then(|| {
        let rx = dedup.subscribe();
        let verbose = cli.verbose;
        thread::spawn(move || print_events(rx, verbose, ready_tx))
    });

    let skip_prompt = cli.yes;
    let result = dedup.run(|request: &ConfirmRequest| {
        if skip_prompt {
            return true;
        }
        let _ = ready_rx.recv();
        prompt(request)
    });

    // Closing the bus ends the printer loop.
    drop(dedup);
    if let Some(handle) = printer {
        if handle.join().is_err() {
            warn!("event printer thread panicked");
        }
    }

    let summary = result.wrap_err("Run failed")?;
    info!(
        status = ?summary.status,
        duplicates = summary.duplicates_found,
        removed = summary.files_deleted_or_simulated,
        errors = summary.errors.len(),
        "run finished"
    );

    match cli.format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if summary.has_errors() {
        Ok(ExitCode::from(EXIT_FILE_ERRORS))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Ask on stderr and accept only a literal `yes`.
fn prompt(request: &ConfirmRequest) -> bool {
    eprint!(
        "Delete {} duplicate file(s) ({}) from the target tree? Type 'yes' to continue: ",
        request.duplicates,
        format_size(request.bytes)
    );
    let _ = io::stderr().flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim() == "yes",
        Err(_) => false,
    }
}

/// Render events until the bus closes.
fn print_events(mut rx: EventReceiver, verbose: bool, ready: mpsc::Sender<()>) {
    loop {
        let event = match rx.blocking_recv() {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                if verbose {
                    eprintln!("  ... {missed} event(s) skipped");
                }
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            DedupEvent::StateChanged(RunState::AwaitingConfirmation) => {
                if verbose {
                    eprintln!("[{}]", RunState::AwaitingConfirmation);
                }
                let _ = ready.send(());
            }
            DedupEvent::StateChanged(state) if verbose => eprintln!("[{state}]"),
            DedupEvent::FileScanned { role, path, count } if verbose => {
                eprintln!("  {role} #{count}: {}", path.display())
            }
            DedupEvent::ScanCompleted {
                role,
                files,
                errors,
            } => eprintln!("Scanned {role}: {files} file(s), {errors} error(s)"),
            DedupEvent::DuplicateFound {
                relative_path,
                size,
            } if verbose => eprintln!("  duplicate {relative_path} ({})", format_size(size)),
            DedupEvent::WouldDelete {
                path,
                reference,
                fingerprint,
                size,
            } => {
                eprintln!("  would delete {} ({})", path.display(), format_size(size));
                eprintln!("    reference {} [blake3 {fingerprint}]", reference.display());
            }
            DedupEvent::Deleted {
                path,
                reference,
                fingerprint,
                size,
            } => {
                eprintln!("  deleted {} ({})", path.display(), format_size(size));
                eprintln!("    reference {} [blake3 {fingerprint}]", reference.display());
            }
            DedupEvent::DeleteFailed {
                path,
                kind,
                message,
            } => eprintln!("  FAILED {} [{kind}]: {message}", path.display()),
            DedupEvent::WouldPrune { path } => {
                eprintln!("  would remove empty directory {}", path.display())
            }
            DedupEvent::Pruned { path } => {
                eprintln!("  removed empty directory {}", path.display())
            }
            DedupEvent::PruneFailed(warning) | DedupEvent::Warning(warning) => {
                eprintln!("  warning: {}: {}", warning.path.display(), warning.message)
            }
            _ => {}
        }
    }
}

/// Print the final summary.
fn print_summary(summary: &RunSummary) {
    let dry_run = summary.mode.is_dry_run();

    println!();
    println!("{}", "─".repeat(60));
    println!(" Mode:        {}", summary.mode);
    println!(
        " Reference:   {} ({} files)",
        summary.reference_root.display(),
        summary.files_scanned_reference
    );
    println!(
        " Target:      {} ({} files)",
        summary.target_root.display(),
        summary.files_scanned_target
    );
    println!(" Duplicates:  {}", summary.duplicates_found);
    println!("{}", "─".repeat(60));

    match summary.status {
        RunStatus::NoDuplicates => println!(" No duplicates found."),
        RunStatus::Declined => println!(" Aborted. Nothing was deleted."),
        RunStatus::Completed => {
            println!(
                " {} {} file(s), {}",
                if dry_run { "Would delete" } else { "Deleted" },
                summary.files_deleted_or_simulated,
                format_size(summary.bytes_freed_total)
            );
            if !summary.pruned_dirs.is_empty() {
                println!(
                    " {} {} empty director{}",
                    if dry_run { "Would remove" } else { "Removed" },
                    summary.pruned_dirs.len(),
                    if summary.pruned_dirs.len() == 1 { "y" } else { "ies" }
                );
            }
            if dry_run {
                println!(" Run again with --live to delete.");
            }
        }
    }

    if !summary.errors.is_empty() {
        println!();
        println!(" {} error(s):", summary.errors.len());
        for error in &summary.errors {
            println!("   {} [{}]: {}", error.path.display(), error.kind, error.message);
        }
    }

    if !summary.warnings.is_empty() {
        println!();
        println!(" {} warning(s):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("   {}: {}", warning.path.display(), warning.message);
        }
    }

    println!();
    println!(" Completed in {:.2}s", summary.duration.as_secs_f64());
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refdedup_ops::EventBus;
    use std::time::Duration;

    #[test]
    fn test_printer_signals_before_prompt() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || print_events(rx, false, ready_tx));

        bus.emit(DedupEvent::StateChanged(RunState::Matching));
        assert!(ready_rx.recv_timeout(Duration::from_millis(100)).is_err());

        bus.emit(DedupEvent::StateChanged(RunState::AwaitingConfirmation));
        assert!(ready_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        drop(bus);
        assert!(handle.join().is_ok());
    }
}
