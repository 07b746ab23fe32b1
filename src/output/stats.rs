//! Statistics gathered from the shared store
//!
//! Everything here is read straight from the database, so `--stats` works
//! while other processes are still crawling into it.

use crate::state::CrawlCounters;
use crate::storage::{CounterStore, DocumentStore, FrontierStore, StorageResult};
use crate::url::Store;

/// Record counts for one storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTotals {
    pub store: Store,
    pub games: u64,
    pub reviews: u64,
    pub assets: u64,
}

/// Crawl statistics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Per-store record counts, in `Store::ALL` order
    pub stores: Vec<StoreTotals>,

    pub total_games: u64,
    pub total_reviews: u64,
    pub total_assets: u64,

    /// URLs waiting in the frontier
    pub frontier_len: u64,

    /// URLs ever admitted to the frontier
    pub seen_urls: u64,

    pub counters: CrawlCounters,

    /// Game count per genre, most common first
    pub genres: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - Any backend providing the three storage services
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn gather_statistics<S>(storage: &S) -> StorageResult<CrawlStatistics>
where
    S: FrontierStore + DocumentStore + CounterStore,
{
    let mut stores = Vec::with_capacity(Store::ALL.len());
    for store in Store::ALL {
        stores.push(StoreTotals {
            store,
            games: storage.count_games(Some(store))?,
            reviews: storage.count_reviews(Some(store))?,
            assets: storage.count_assets(Some(store))?,
        });
    }

    Ok(CrawlStatistics {
        stores,
        total_games: storage.count_games(None)?,
        total_reviews: storage.count_reviews(None)?,
        total_assets: storage.count_assets(None)?,
        frontier_len: storage.frontier_len()?,
        seen_urls: storage.seen_count()?,
        counters: storage.load_counters()?,
        genres: storage.genre_breakdown()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Progress:");
    println!("  Pages crawled: {}", stats.counters.pages_crawled);
    println!("  Apps indexed: {}", stats.counters.apps_indexed);
    println!("  Frontier: {} queued / {} seen", stats.frontier_len, stats.seen_urls);
    println!();

    println!("Documents:");
    println!(
        "  {:<10} {:>8} {:>8} {:>8}",
        "store", "games", "reviews", "assets"
    );
    for totals in &stats.stores {
        println!(
            "  {:<10} {:>8} {:>8} {:>8}",
            totals.store.as_str(),
            totals.games,
            totals.reviews,
            totals.assets
        );
    }
    println!(
        "  {:<10} {:>8} {:>8} {:>8}",
        "total", stats.total_games, stats.total_reviews, stats.total_assets
    );
    println!();

    if !stats.genres.is_empty() {
        println!("Genres:");
        for (genre, count) in &stats.genres {
            let percentage = if stats.total_games > 0 {
                (*count as f64 / stats.total_games as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", genre, count, percentage);
        }
    }
}
