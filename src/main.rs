//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the Listing-Harvester crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvester::checkpoint::open_store;
use listing_harvester::config::{load_config_with_hash, Config};
use listing_harvester::crawler::{run_harvest, RetryPolicy};
use listing_harvester::output::print_checkpoint_status;
use listing_harvester::CheckpointStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a resumable listing crawler
///
/// Listing-Harvester walks a catalog of listing groups, extracts one record
/// per listing and checkpoints its progress so an interrupted run can be
/// resumed from the last flushed catalog index.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A resumable listing crawler", long_about = None)]
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

    /// Resume from the stored checkpoint (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Delete the stored checkpoint and start from the first catalog entry
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show the stored checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.status {
        handle_status(&config)
    } else {
        handle_harvest(&config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.output);
    let resume_index = store
        .load_resume_index()
        .context("Failed to read checkpoint index")?;
    let policy = RetryPolicy::from_config(&config.session_retry);

    println!("=== Listing-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Entry URL: {}", config.crawler.entry_url);
    println!("  Checkpoint every: {} nodes", config.crawler.checkpoint_every);
    println!("  Settle delay: {}ms", config.crawler.settle_delay_ms);
    println!("  Poll interval: {}ms", config.crawler.poll_interval_ms);

    println!("\nTimeouts:");
    println!("  Catalog: {}s", config.timeouts.catalog_secs);
    println!("  Group results: {}s", config.timeouts.group_secs);
    println!("  Detail page: {}s", config.timeouts.detail_secs);

    println!("\nSession Recovery:");
    println!("  Max attempts: {}", policy.max_attempts);
    println!("  Backoff: {:?}", policy.backoff_delay);
    println!("  When exhausted: {:?}", policy.on_exhausted);

    println!("\nMarkers:");
    for (name, selector) in config.markers.named() {
        println!("  {}: {}", name, selector);
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Checkpoint index: {}", config.output.state_path);
    println!("  Records: {}", config.output.records_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start at catalog index {}", resume_index);

    Ok(())
}

/// Handles the --status mode: shows the stored checkpoint
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.output);
    let state = store
        .read_state()
        .with_context(|| format!("Failed to read checkpoint at {}", config.output.state_path))?;

    print_checkpoint_status(&state);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let mut store = open_store(&config.output);

    if fresh {
        tracing::info!("Starting fresh harvest (clearing previous checkpoint)");
        store.clear().context("Failed to clear checkpoint")?;
    } else {
        tracing::info!("Starting harvest (will resume from checkpoint if present)");
    }

    match run_harvest(config, store).await {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
