//! Storefront crawler entry point
//!
//! Command-line interface for crawling Myket and Cafe Bazaar listings into
//! the shared document store.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use storefront_crawler::config::{load_config_with_hash, Config};
use storefront_crawler::crawler::{run_crawl, static_seeds};
use storefront_crawler::extract::backfill_genres;
use storefront_crawler::output::{gather_statistics, print_statistics};
use storefront_crawler::storage::{open_storage, CounterStore, FrontierStore, SqliteStorage};
use tracing_subscriber::EnvFilter;

/// Storefront crawler: indexes app listings from Myket and Cafe Bazaar
///
/// Several crawler processes may point at the same database; they share one
/// frontier, one seen-set and one set of quota counters.
#[derive(Parser, Debug)]
#[command(name = "storefront-crawler")]
#[command(version)]
#[command(about = "Crawls Myket and Cafe Bazaar app listings", long_about = None)]
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

    /// Clear the frontier, seen-set and counters before crawling (documents are kept)
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,

    /// Fill in unknown genres from each game's source list URL and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "fresh"])]
    backfill_genre: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.backfill_genre {
        handle_backfill_genre(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags when it is set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "storefront_crawler=info,warn",
            1 => "storefront_crawler=debug,info",
            2 => "storefront_crawler=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    open_storage(path).with_context(|| format!("failed to open database {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Storefront Crawler Dry Run ===\n");

    println!("Crawler:");
    println!("  Workers: {}", config.crawler.concurrency);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!(
        "  Quotas: {} pages, {} apps (0 = unlimited)",
        config.crawler.max_pages, config.crawler.max_apps
    );
    println!("  Same domain only: {}", config.crawler.same_domain_only);
    println!("  Follow lists: {}", config.crawler.follow_lists);

    println!("\nRetry:");
    println!(
        "  {} attempts, {}ms base delay x{}, capped at {}ms",
        config.retry.max_attempts,
        config.retry.base_delay_ms,
        config.retry.multiplier,
        config.retry.max_delay_ms
    );

    println!("\nEnrichment:");
    println!(
        "  Reviews: {} (cap {}, supplemental: {})",
        config.enrichment.reviews,
        config.enrichment.review_cap,
        config.enrichment.supplemental_reviews
    );
    println!("  Assets: {}", config.enrichment.assets);

    println!("\nDiscovery:");
    if config.discovery.enabled {
        println!(
            "  Up to {} list URLs per root, pages 2..={}",
            config.discovery.max_lists, config.discovery.max_page
        );
        for root in &config.discovery.roots {
            println!("  * {}", root);
        }
    } else {
        println!("  disabled");
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let seeds = static_seeds(&config.seeds)?;
    println!("\nStatic Seeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open(config)?;
    let stats = gather_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --backfill-genre mode: re-derives unknown genres in place
fn handle_backfill_genre(config: &Config) -> anyhow::Result<()> {
    let mut storage = open(config)?;
    let report = backfill_genres(&mut storage)?;

    println!(
        "✓ Backfilled {} of {} unknown-genre games",
        report.updated, report.examined
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (clearing frontier and counters)");
        let mut storage = open(&config)?;
        storage.reset_frontier()?;
        storage.reset_counters()?;
    } else {
        tracing::info!("Starting crawl (will resume a non-empty frontier)");
    }

    match run_crawl(config).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed: {} workers, {} seeds, {} pages, {} apps indexed",
                summary.workers,
                summary.seeded,
                summary.pages,
                summary.indexed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
