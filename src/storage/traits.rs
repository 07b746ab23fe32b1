//! Storage traits and error types
//!
//! The crawler needs three shared services: a frontier (queue + seen-set),
//! a document store for game/review/asset records, and shared counters.
//! Any backend offering atomic insert-if-absent and atomic pop can implement
//! them; the crate ships a SQLite implementation.

use crate::state::{CrawlCounters, FrontierItem};
use crate::storage::{AssetRecord, BulkOutcome, GameRecord, ReviewRecord};
use crate::url::Store;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable queue of URLs to fetch, paired with a seen-set
///
/// Delivery is at-most-once: a dequeued item is gone, whether or not the
/// worker that took it finishes processing.
pub trait FrontierStore {
    /// Pushes seeds only if the queue is currently empty
    ///
    /// Seeds are also recorded in the seen-set. Returns how many were pushed
    /// (0 when the queue already held items).
    fn initialize(&mut self, seeds: &[FrontierItem]) -> StorageResult<usize>;

    /// Test-and-set enqueue keyed on the item URL
    ///
    /// On first insertion into the seen-set the item is pushed to the head
    /// (`priority`) or tail of the queue and `true` is returned. Already-seen
    /// URLs are ignored.
    fn enqueue(&mut self, item: &FrontierItem, priority: bool) -> StorageResult<bool>;

    /// Removes and returns the item at the head of the queue
    fn dequeue(&mut self) -> StorageResult<Option<FrontierItem>>;

    /// Number of items waiting in the queue
    fn frontier_len(&self) -> StorageResult<u64>;

    /// Number of URLs ever admitted to the frontier
    fn seen_count(&self) -> StorageResult<u64>;

    /// Empties the queue and the seen-set
    fn reset_frontier(&mut self) -> StorageResult<()>;
}

/// Upsert-only document index for the three record families
pub trait DocumentStore {
    /// Creates or overwrites the game record; returns its id
    fn upsert_game(&mut self, game: &GameRecord) -> StorageResult<String>;

    /// Gets a game by id
    fn get_game(&self, id: &str) -> StorageResult<Option<GameRecord>>;

    /// Batched review upsert; per-item failures are reported, not raised
    fn upsert_reviews(&mut self, reviews: &[ReviewRecord]) -> StorageResult<BulkOutcome>;

    /// Batched asset upsert; per-item failures are reported, not raised
    fn upsert_assets(&mut self, assets: &[AssetRecord]) -> StorageResult<BulkOutcome>;

    /// Reviews stored for one app
    fn get_reviews(&self, store: Store, app_id: &str) -> StorageResult<Vec<ReviewRecord>>;

    /// Assets stored for one app
    fn get_assets(&self, store: Store, app_id: &str) -> StorageResult<Vec<AssetRecord>>;

    /// Counts games, optionally for one store
    fn count_games(&self, store: Option<Store>) -> StorageResult<u64>;

    /// Counts reviews, optionally for one store
    fn count_reviews(&self, store: Option<Store>) -> StorageResult<u64>;

    /// Counts assets, optionally for one store
    fn count_assets(&self, store: Option<Store>) -> StorageResult<u64>;

    /// Ids and referring list URLs of games stored with the unknown genre
    fn games_missing_genre(&self) -> StorageResult<Vec<(String, String)>>;

    /// Sets a game's genre if it is still unknown; returns whether it changed
    fn set_missing_genre(&mut self, id: &str, genre: &str) -> StorageResult<bool>;

    /// Game count per genre, most common first
    fn genre_breakdown(&self) -> StorageResult<Vec<(String, u64)>>;
}

/// Shared crawl counters, the source of truth for quotas
pub trait CounterStore {
    /// Atomically adds `by` to a named counter and returns the new value
    fn increment_counter(&mut self, name: &str, by: u64) -> StorageResult<u64>;

    /// Reads all crawl counters
    fn load_counters(&self) -> StorageResult<CrawlCounters>;

    /// Sets all counters back to zero
    fn reset_counters(&mut self) -> StorageResult<()>;
}
