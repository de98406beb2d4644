//! Bible-Harvest main entry point
//!
//! This is the command-line interface for the resumable Bible harvester.

use anyhow::Context;
use bible_harvest::config::{
    load_config_or_default, resolve_app_key, validate, Config, DumpOverrides,
};
use bible_harvest::output::{load_status, print_harvest_report, print_import_report, print_status};
use bible_harvest::{crawler, import, DatasetLayout, HarvestError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bible-Harvest: a resumable passage crawler and bulk importer
///
/// `dump` walks a Bible version book by book, chapter by chapter, verse by
/// verse, and can be interrupted and re-run at any point. `import` loads a
/// finished (or partial) dump into a relational catalog.
#[derive(Parser, Debug)]
#[command(name = "bible-harvest")]
#[command(version)]
#[command(about = "A resumable Bible passage harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (optional; defaults apply without one)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest metadata, index and passages for a dataset
    Dump {
        /// Dataset (Bible version) id
        #[arg(long)]
        dataset_id: String,

        /// Output directory; the dataset lands in <OUT>/<dataset-id>/
        #[arg(long, value_name = "DIR")]
        out: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<f64>,

        /// Sleep between successful requests in seconds
        #[arg(long, value_name = "SECS")]
        sleep: Option<f64>,

        /// Passage format requested from the API
        #[arg(long)]
        format: Option<String>,

        /// Ask the API to include section headings
        #[arg(long)]
        include_headings: bool,

        /// Ask the API to include notes
        #[arg(long)]
        include_notes: bool,

        /// Fetch metadata and index only
        #[arg(long)]
        meta_only: bool,

        /// Stop (resumably) after this many requests in this run
        #[arg(long, value_name = "N")]
        request_budget: Option<u64>,
    },

    /// Import a harvested dataset into the relational catalog
    Import {
        /// Dataset (Bible version) id
        #[arg(long)]
        dataset_id: String,

        /// Directory the dump wrote into
        #[arg(long, value_name = "DIR")]
        data_dir: Option<String>,

        /// Catalog database file
        #[arg(long, value_name = "FILE")]
        database: Option<String>,

        /// Verses per transaction
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,
    },

    /// Show harvest progress for a dataset
    Status {
        /// Dataset (Bible version) id
        #[arg(long)]
        dataset_id: String,

        /// Directory the dump writes into
        #[arg(long, value_name = "DIR")]
        out: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to build default configuration".to_string(),
        }
    })?;

    match cli.command {
        Command::Dump {
            dataset_id,
            out,
            timeout,
            sleep,
            format,
            include_headings,
            include_notes,
            meta_only,
            request_budget,
        } => {
            config.apply_dump_overrides(&DumpOverrides {
                data_dir: out,
                timeout_secs: timeout,
                sleep_secs: sleep,
                format,
                include_headings,
                include_notes,
                request_budget,
            });
            validate(&config).context("Invalid options")?;
            resolve_app_key(&mut config);
            handle_dump(config, &dataset_id, meta_only).await?;
        }
        Command::Import {
            dataset_id,
            data_dir,
            database,
            batch_size,
        } => {
            if let Some(dir) = data_dir {
                config.output.data_dir = dir;
            }
            if let Some(path) = database {
                config.import.database_path = path;
            }
            if let Some(size) = batch_size {
                config.import.batch_size = size;
            }
            validate(&config).context("Invalid options")?;
            handle_import(&config, &dataset_id)?;
        }
        Command::Status { dataset_id, out } => {
            if let Some(dir) = out {
                config.output.data_dir = dir;
            }
            let layout = DatasetLayout::new(&config.output.data_dir, &dataset_id);
            let status = load_status(&layout, &dataset_id)?;
            print_status(&status);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bible_harvest=info,warn"),
            1 => EnvFilter::new("bible_harvest=debug,info"),
            2 => EnvFilter::new("bible_harvest=trace,debug"),
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

/// Handles the dump command
async fn handle_dump(config: Config, dataset_id: &str, meta_only: bool) -> anyhow::Result<()> {
    // The harvester has already logged where the checkpoint was saved
    match crawler::dump(config, dataset_id, meta_only).await {
        Ok(report) => {
            print_harvest_report(&report);
            Ok(())
        }
        Err(e) if e.is_resumable() => Err(e).context("Harvest interrupted"),
        Err(e) => Err(e).context("Harvest failed"),
    }
}

/// Handles the import command
fn handle_import(config: &Config, dataset_id: &str) -> anyhow::Result<()> {
    match import::run_import(config, dataset_id) {
        Ok(report) => {
            print_import_report(&report);
            Ok(())
        }
        Err(HarvestError::MissingArtifact { path }) => Err(anyhow::anyhow!(
            "{} not found; run `bible-harvest dump --dataset-id {}` first",
            path.display(),
            dataset_id
        )),
        Err(e) => Err(e).context("Import failed"),
    }
}
