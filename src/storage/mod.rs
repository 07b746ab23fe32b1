//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Frontier queue and seen-set shared between workers and processes
//! - Game, review and asset document upserts
//! - Shared crawl counters backing the page and app quotas

mod records;
mod schema;
mod sqlite;
mod traits;

pub use records::{
    asset_id, game_id, review_id, AssetKind, AssetRecord, BulkOutcome, GameRecord, ReviewRecord,
};
pub use sqlite::SqliteStorage;
pub use traits::{CounterStore, DocumentStore, FrontierStore, StorageError, StorageResult};

use crate::CrawlError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::new(path)
}
