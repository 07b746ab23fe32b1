//! SQLite storage implementation
//!
//! One database file backs the frontier, the seen-set, the shared counters and
//! the three document families. Several processes may open the same file; all
//! mutating frontier operations run in `BEGIN IMMEDIATE` transactions so that
//! insert-if-absent and pop stay atomic across connections.

use crate::state::{CrawlCounters, FrontierItem, APPS_INDEXED, PAGES_CRAWLED};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    CounterStore, DocumentStore, FrontierStore, StorageError, StorageResult,
};
use crate::storage::{AssetKind, AssetRecord, BulkOutcome, GameRecord, ReviewRecord};
use crate::url::Store;
use crate::extract::UNKNOWN_GENRE;
use crate::CrawlError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

const GAME_UPSERT_SQL: &str = "
    INSERT INTO games (id, store, app_id, title, genre, rating, ratings_count, installs,
        developer, description, monetization, feature_flags, released_at, updated_at,
        indexed_at, source_url, source_list_url)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        genre = excluded.genre,
        rating = excluded.rating,
        ratings_count = excluded.ratings_count,
        installs = excluded.installs,
        developer = excluded.developer,
        description = excluded.description,
        monetization = excluded.monetization,
        feature_flags = excluded.feature_flags,
        released_at = excluded.released_at,
        updated_at = excluded.updated_at,
        indexed_at = excluded.indexed_at,
        source_url = excluded.source_url,
        source_list_url = excluded.source_list_url";

const REVIEW_UPSERT_SQL: &str = "
    INSERT INTO reviews (id, store, app_id, app_title, author, rating, title, body,
        created_at, indexed_at, source_url)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(id) DO UPDATE SET
        app_title = excluded.app_title,
        rating = excluded.rating,
        indexed_at = excluded.indexed_at,
        source_url = excluded.source_url";

const ASSET_UPSERT_SQL: &str = "
    INSERT INTO assets (id, store, app_id, app_title, type, url, indexed_at, source_url)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(id) DO UPDATE SET
        app_title = excluded.app_title,
        indexed_at = excluded.indexed_at,
        source_url = excluded.source_url";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the crawl database at `path`
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        let conn = Connection::open(path)?;

        // Other crawler processes may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(10))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database, private to this connection
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn immediate(&mut self) -> StorageResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    fn count_by_store(&self, table: &str, store: Option<Store>) -> StorageResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE (?1 IS NULL OR store = ?1)",
            table
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params![store.map(|s| s.as_str())], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Pushes a payload at the head or tail of the queue
fn push_payload(tx: &Transaction<'_>, payload: &str, priority: bool) -> rusqlite::Result<()> {
    let sql = if priority {
        "INSERT INTO frontier_queue (seq, payload)
         SELECT COALESCE(MIN(seq), 0) - 1, ?1 FROM frontier_queue"
    } else {
        "INSERT INTO frontier_queue (seq, payload)
         SELECT COALESCE(MAX(seq), 0) + 1, ?1 FROM frontier_queue"
    };
    tx.execute(sql, params![payload])?;
    Ok(())
}

fn store_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Store> {
    let value: String = row.get(idx)?;
    Store::from_db_string(&value)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, value, Type::Text))
}

fn optional_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u64>> {
    Ok(row.get::<_, Option<i64>>(idx)?.map(|v| v.max(0) as u64))
}

fn flags_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let value: String = row.get(idx)?;
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        store: store_column(row, 1)?,
        app_id: row.get(2)?,
        title: row.get(3)?,
        genre: row.get(4)?,
        rating: row.get(5)?,
        ratings_count: optional_u64(row, 6)?,
        installs: optional_u64(row, 7)?,
        developer: row.get(8)?,
        description: row.get(9)?,
        monetization: row.get(10)?,
        feature_flags: flags_column(row, 11)?,
        released_at: row.get(12)?,
        updated_at: row.get(13)?,
        indexed_at: row.get(14)?,
        source_url: row.get(15)?,
        source_list_url: row.get(16)?,
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewRecord> {
    Ok(ReviewRecord {
        store: store_column(row, 0)?,
        app_id: row.get(1)?,
        app_title: row.get(2)?,
        author: row.get(3)?,
        rating: row.get(4)?,
        title: row.get(5)?,
        body: row.get(6)?,
        created_at: row.get(7)?,
        indexed_at: row.get(8)?,
        source_url: row.get(9)?,
    })
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<AssetRecord> {
    let kind: String = row.get(3)?;
    Ok(AssetRecord {
        store: store_column(row, 0)?,
        app_id: row.get(1)?,
        app_title: row.get(2)?,
        kind: AssetKind::from_db_string(&kind)
            .ok_or_else(|| rusqlite::Error::InvalidColumnType(3, kind, Type::Text))?,
        url: row.get(4)?,
        indexed_at: row.get(5)?,
        source_url: row.get(6)?,
    })
}

impl FrontierStore for SqliteStorage {
    fn initialize(&mut self, seeds: &[FrontierItem]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.immediate()?;

        let queued: i64 = tx.query_row("SELECT COUNT(*) FROM frontier_queue", [], |row| {
            row.get(0)
        })?;
        if queued > 0 {
            return Ok(0);
        }

        let mut pushed = HashSet::new();
        for seed in seeds {
            if !pushed.insert(seed.url.as_str()) {
                continue;
            }
            tx.execute(
                "INSERT OR IGNORE INTO seen_urls (url, first_seen) VALUES (?1, ?2)",
                params![seed.url, now],
            )?;
            push_payload(&tx, &seed.to_payload()?, false)?;
        }

        tx.commit()?;
        Ok(pushed.len())
    }

    fn enqueue(&mut self, item: &FrontierItem, priority: bool) -> StorageResult<bool> {
        let payload = item.to_payload()?;
        let now = Utc::now().to_rfc3339();
        let tx = self.immediate()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO seen_urls (url, first_seen) VALUES (?1, ?2)",
            params![item.url, now],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        push_payload(&tx, &payload, priority)?;
        tx.commit()?;
        Ok(true)
    }

    fn dequeue(&mut self) -> StorageResult<Option<FrontierItem>> {
        loop {
            let tx = self.immediate()?;
            let head: Option<(i64, String)> = tx
                .query_row(
                    "SELECT seq, payload FROM frontier_queue ORDER BY seq ASC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (seq, payload) = match head {
                Some(head) => head,
                None => return Ok(None),
            };

            tx.execute("DELETE FROM frontier_queue WHERE seq = ?1", params![seq])?;
            tx.commit()?;

            match FrontierItem::from_payload(&payload) {
                Ok(item) => return Ok(Some(item)),
                Err(e) => tracing::warn!("Dropping unreadable frontier entry {}: {}", seq, e),
            }
        }
    }

    fn frontier_len(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM frontier_queue", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn seen_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn reset_frontier(&mut self) -> StorageResult<()> {
        let tx = self.immediate()?;
        tx.execute("DELETE FROM frontier_queue", [])?;
        tx.execute("DELETE FROM seen_urls", [])?;
        tx.commit()?;
        Ok(())
    }
}

impl DocumentStore for SqliteStorage {
    fn upsert_game(&mut self, game: &GameRecord) -> StorageResult<String> {
        let id = game.id();
        let flags = serde_json::to_string(&game.feature_flags)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.conn.execute(
            GAME_UPSERT_SQL,
            params![
                id,
                game.store.as_str(),
                game.app_id,
                game.title,
                game.genre,
                game.rating,
                game.ratings_count.map(|v| v as i64),
                game.installs.map(|v| v as i64),
                game.developer,
                game.description,
                game.monetization,
                flags,
                game.released_at,
                game.updated_at,
                game.indexed_at,
                game.source_url,
                game.source_list_url,
            ],
        )?;

        Ok(id)
    }

    fn get_game(&self, id: &str) -> StorageResult<Option<GameRecord>> {
        let game = self
            .conn
            .query_row(
                "SELECT id, store, app_id, title, genre, rating, ratings_count, installs,
                 developer, description, monetization, feature_flags, released_at,
                 updated_at, indexed_at, source_url, source_list_url
                 FROM games WHERE id = ?1",
                params![id],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    fn upsert_reviews(&mut self, reviews: &[ReviewRecord]) -> StorageResult<BulkOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = BulkOutcome::default();
        {
            let mut stmt = tx.prepare(REVIEW_UPSERT_SQL)?;
            for review in reviews {
                let id = review.id();
                let result = stmt.execute(params![
                    id,
                    review.store.as_str(),
                    review.app_id,
                    review.app_title,
                    review.author,
                    review.rating,
                    review.title,
                    review.body,
                    review.created_at,
                    review.indexed_at,
                    review.source_url,
                ]);
                match result {
                    Ok(_) => outcome.written += 1,
                    Err(e) => outcome.failed.push((id, e.to_string())),
                }
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    fn upsert_assets(&mut self, assets: &[AssetRecord]) -> StorageResult<BulkOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = BulkOutcome::default();
        {
            let mut stmt = tx.prepare(ASSET_UPSERT_SQL)?;
            for asset in assets {
                let id = asset.id();
                let result = stmt.execute(params![
                    id,
                    asset.store.as_str(),
                    asset.app_id,
                    asset.app_title,
                    asset.kind.to_db_string(),
                    asset.url,
                    asset.indexed_at,
                    asset.source_url,
                ]);
                match result {
                    Ok(_) => outcome.written += 1,
                    Err(e) => outcome.failed.push((id, e.to_string())),
                }
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    fn get_reviews(&self, store: Store, app_id: &str) -> StorageResult<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT store, app_id, app_title, author, rating, title, body, created_at,
             indexed_at, source_url
             FROM reviews WHERE store = ?1 AND app_id = ?2 ORDER BY rowid",
        )?;

        let reviews = stmt
            .query_map(params![store.as_str(), app_id], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    fn get_assets(&self, store: Store, app_id: &str) -> StorageResult<Vec<AssetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT store, app_id, app_title, type, url, indexed_at, source_url
             FROM assets WHERE store = ?1 AND app_id = ?2 ORDER BY rowid",
        )?;

        let assets = stmt
            .query_map(params![store.as_str(), app_id], asset_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(assets)
    }

    fn count_games(&self, store: Option<Store>) -> StorageResult<u64> {
        self.count_by_store("games", store)
    }

    fn count_reviews(&self, store: Option<Store>) -> StorageResult<u64> {
        self.count_by_store("reviews", store)
    }

    fn count_assets(&self, store: Option<Store>) -> StorageResult<u64> {
        self.count_by_store("assets", store)
    }

    fn games_missing_genre(&self) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_list_url FROM games
             WHERE genre = ?1 AND source_list_url IS NOT NULL
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![UNKNOWN_GENRE], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn set_missing_genre(&mut self, id: &str, genre: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE games SET genre = ?1 WHERE id = ?2 AND genre = ?3",
            params![genre, id, UNKNOWN_GENRE],
        )?;
        Ok(changed > 0)
    }

    fn genre_breakdown(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT genre, COUNT(*) AS n FROM games GROUP BY genre ORDER BY n DESC, genre ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl CounterStore for SqliteStorage {
    fn increment_counter(&mut self, name: &str, by: u64) -> StorageResult<u64> {
        let value: i64 = self.conn.query_row(
            "INSERT INTO counters (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = value + excluded.value
             RETURNING value",
            params![name, by as i64],
            |row| row.get(0),
        )?;
        Ok(value as u64)
    }

    fn load_counters(&self) -> StorageResult<CrawlCounters> {
        let read = |name: &str| -> StorageResult<u64> {
            let value: Option<i64> = self
                .conn
                .query_row(
                    "SELECT value FROM counters WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.unwrap_or(0) as u64)
        };

        Ok(CrawlCounters {
            pages_crawled: read(PAGES_CRAWLED)?,
            apps_indexed: read(APPS_INDEXED)?,
        })
    }

    fn reset_counters(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM counters", [])?;
        Ok(())
    }
}
