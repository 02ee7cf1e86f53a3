//! ApkScout main entry point
//!
//! This is the command-line interface for the ApkScout catalog crawler.

use apkscout::config::load_config_with_hash;
use apkscout::crawler::run_crawl;
use apkscout::storage::{open_storage, RecordStore};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ApkScout: a catalog crawler for APK analysis reports
///
/// ApkScout walks a paginated remote catalog of sample identifiers,
/// fetches per-identifier detail reports concurrently, and stores the
/// normalized records in a SQLite database without duplicating work
/// across runs.
#[derive(Parser, Debug)]
#[command(name = "apkscout")]
#[command(version = "1.0.0")]
#[command(about = "A catalog crawler for APK analysis reports", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show record and run statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
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
            0 => EnvFilter::new("apkscout=info,warn"),
            1 => EnvFilter::new("apkscout=debug,info"),
            2 => EnvFilter::new("apkscout=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &apkscout::config::Config) {
    println!("=== ApkScout Dry Run ===\n");

    println!("Catalog:");
    println!("  Listing URL: {}", config.catalog.listing_url);
    println!("  Detail URL: {}", config.catalog.detail_url);
    println!("  Page size: {}", config.catalog.page_size);
    println!("  Ineligible status: {}", config.catalog.ineligible_status);

    println!("\nCrawler:");
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    match config.crawler.target_records {
        Some(target) => println!("  Target records: {}", target),
        None => println!("  Target records: none (crawl to exhaustion)"),
    }
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows record and run counts from the database
fn handle_stats(config: &apkscout::config::Config) -> anyhow::Result<()> {
    use std::path::Path;

    println!("Database: {}\n", config.storage.database_path);

    let store = open_storage(Path::new(&config.storage.database_path))?;

    let records = store.count_records()?;
    println!("Stored records: {}", records);

    match store.get_latest_run()? {
        Some(run) => {
            println!("\nLatest run #{} ({}):", run.id, run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!(
                "  Attempted: {}, stored: {}, failed: {}",
                run.attempted, run.stored, run.failed
            );
        }
        None => println!("\nNo runs recorded yet"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: apkscout::config::Config,
    config_hash: &str,
) -> anyhow::Result<()> {
    match config.crawler.target_records {
        Some(target) => tracing::info!("Starting crawl, stopping at {} stored records", target),
        None => tracing::info!("Starting crawl, running until the catalog is exhausted"),
    }

    match run_crawl(config, config_hash).await {
        Ok(summary) => {
            println!(
                "Crawl complete: {} attempted, {} stored, {} failed",
                summary.attempted, summary.stored, summary.failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
