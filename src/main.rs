use anyhow::Context;
use clap::{Parser, Subcommand};
use genetic_systems_db::{Aggregator, IngestReport, RunConfig, Statistics, UnifiedTable};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genetic-systems-db")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Builds the unified 5'UTR/CDS expression table from published experiments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every configured experiment and write the table as Arrow IPC
    Build {
        /// Path to the run configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output path, overriding the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ingest every configured experiment and summarize one field
    Stats {
        /// Path to the run configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Field to analyze, e.g. TRANSL.RATE
        #[arg(short, long)]
        field: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, output } => {
            let config = load_config(&config)?;
            let (table, report) = build(&config);
            print_report(&report);

            let output = output.unwrap_or_else(|| config.effective_output());
            let bytes = genetic_systems_db::arrow_handler::build_table_ipc(&table)?;
            fs::write(&output, bytes)
                .with_context(|| format!("cannot write {}", output.display()))?;

            info!(rows = table.len(), output = %output.display(), "table written");
            println!(
                "Wrote {} rows x {} columns to {}",
                table.len(),
                table.column_names().len(),
                output.display()
            );
        }

        Commands::Stats { config, field } => {
            let config = load_config(&config)?;
            let (table, report) = build(&config);
            print_report(&report);

            if let Some(stats) = Statistics::compute(&table, &field) {
                print_stats(&stats);
            } else {
                println!("Could not compute statistics for field '{}'", field);
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<RunConfig> {
    let config = RunConfig::load(path)?;
    init_tracing(config.effective_log_level());
    Ok(config)
}

/// `GSDB_LOG` wins over the configured level
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_env("GSDB_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn build(config: &RunConfig) -> (UnifiedTable, IngestReport) {
    let mut aggregator = Aggregator::new();
    let report = aggregator.ingest_configured(config);
    (aggregator.finish(), report)
}

fn print_report(report: &IngestReport) {
    println!("\n=== Ingested experiments ===");
    for summary in &report.ingested {
        println!("{:<28} {:>8} rows", summary.paper, summary.record_count);
    }
    if !report.is_clean() {
        println!("\n=== Skipped experiments ===");
        for (paper, error) in &report.failed {
            println!("{:<28} {}", paper, error);
        }
    }
}

fn print_stats(stats: &Statistics) {
    println!("\n=== Statistics for '{}' ===", stats.field);
    println!("Count:     {}", stats.count);
    println!("Undefined: {}", stats.undefined);
    println!("Sum:       {:.4}", stats.sum);
    println!("Mean:      {:.4}", stats.mean);
    println!("Min:       {:.4}", stats.min);
    println!("Max:       {:.4}", stats.max);
}
