//! llms-export main entry point
//!
//! Command-line interface for the export pipeline: drives runs to
//! completion by polling the step state machine, and exposes status and
//! reset operations.

use anyhow::Context;
use clap::Parser;
use llms_export::config::load_config;
use llms_export::export::ExportController;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// llms-export: publish site content for LLM consumption
///
/// Exports content items to a remote artifact store and assembles an
/// llms.txt-style manifest. Runs are resumable: an interrupted export
/// picks up where it left off on the next invocation.
#[derive(Parser, Debug)]
#[command(name = "llms-export")]
#[command(version)]
#[command(about = "Export content to an artifact store and build a manifest", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh export run (clears any in-flight run first)
    #[arg(long, conflicts_with_all = ["status", "reset", "clear_records"])]
    start: bool,

    /// Show generation status and exit
    #[arg(long, conflicts_with_all = ["start", "reset", "clear_records"])]
    status: bool,

    /// Clear the in-flight run state and exit
    #[arg(long, conflicts_with_all = ["start", "status", "clear_records"])]
    reset: bool,

    /// Delete all stored artifact records and exit
    #[arg(long, conflicts_with_all = ["start", "status", "reset"])]
    clear_records: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    let mut controller = ExportController::from_config(&config)?;

    if cli.status {
        handle_status(&controller)?;
    } else if cli.reset {
        controller.clear_run()?;
        println!("✓ Cleared in-flight run state");
    } else if cli.clear_records {
        let deleted = controller.clear_records()?;
        println!("✓ Deleted {} artifact records", deleted);
    } else {
        handle_export(&mut controller, cli.start).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("llms_export=info,warn"),
            1 => EnvFilter::new("llms_export=debug,info"),
            2 => EnvFilter::new("llms_export=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Drives the step state machine until the run reports finished
async fn handle_export(controller: &mut ExportController, start: bool) -> anyhow::Result<()> {
    let mut report = controller.step(start).await?;

    if report.finished && report.items.total == 0 && !start {
        println!("Nothing to do: no export run is active (use --start to begin one)");
        return Ok(());
    }

    while !report.finished {
        tracing::info!(
            "progress: {}/{} items{}",
            report.items.parsed,
            report.items.total,
            report
                .last
                .as_ref()
                .map(|last| format!(" (last: {} #{})", last.kind, last.id))
                .unwrap_or_default()
        );
        report = controller.step(false).await?;
    }

    println!(
        "✓ Export finished: {}/{} items processed",
        report.items.parsed, report.items.total
    );
    Ok(())
}

/// Handles the --status mode: prints generation status and content stats
fn handle_status(controller: &ExportController) -> anyhow::Result<()> {
    let status = controller.status()?;

    println!("=== llms-export status ===\n");

    match &status.last {
        Some(last) => {
            println!("Last generated: {}", last.generated_at);
            println!("Manifest: {} ({} bytes)", last.manifest_path, last.manifest_size);
        }
        None => println!("Last generated: never"),
    }
    println!(
        "Manifest file present: {} ({})",
        status.manifest_exists, status.manifest_path
    );

    match &status.progress {
        Some(progress) => {
            println!(
                "\nActive run: {} — {}% ({}/{} items, {} errors)",
                progress.status,
                progress.percentage,
                progress.processed,
                progress.total,
                progress.error_count
            );
            if let Some(title) = &progress.current_title {
                println!("Current item: {}", title);
            }
        }
        None => println!("\nActive run: none"),
    }

    let stats = controller.content_stats()?;
    if !stats.is_empty() {
        println!("\nContent items:");
        for entry in stats {
            println!("  {}: {}", entry.kind, entry.count);
        }
    }

    Ok(())
}
