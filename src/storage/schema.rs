//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Frontier queue; head inserts use a sequence below the minimum
CREATE TABLE IF NOT EXISTS frontier_queue (
    seq INTEGER PRIMARY KEY,
    payload TEXT NOT NULL
);

-- Every URL ever admitted to the frontier
CREATE TABLE IF NOT EXISTS seen_urls (
    url TEXT PRIMARY KEY,
    first_seen TEXT NOT NULL
);

-- Shared crawl counters
CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL DEFAULT 0
);

-- One document per (store, app_id)
CREATE TABLE IF NOT EXISTS games (
    id TEXT PRIMARY KEY,
    store TEXT NOT NULL,
    app_id TEXT NOT NULL,
    title TEXT NOT NULL,
    genre TEXT NOT NULL,
    rating REAL,
    ratings_count INTEGER,
    installs INTEGER,
    developer TEXT,
    description TEXT NOT NULL,
    monetization TEXT NOT NULL,
    feature_flags TEXT NOT NULL,
    released_at TEXT,
    updated_at TEXT,
    indexed_at TEXT NOT NULL,
    source_url TEXT NOT NULL,
    source_list_url TEXT
);

CREATE INDEX IF NOT EXISTS idx_games_store ON games(store);
CREATE INDEX IF NOT EXISTS idx_games_genre ON games(genre);

-- Reviews keyed by content hash; no foreign key to games
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    store TEXT NOT NULL,
    app_id TEXT NOT NULL,
    app_title TEXT NOT NULL,
    author TEXT,
    rating REAL,
    title TEXT,
    body TEXT NOT NULL,
    created_at TEXT,
    indexed_at TEXT NOT NULL,
    source_url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_app ON reviews(store, app_id);

-- Images keyed by (store, app_id, type, url) hash
CREATE TABLE IF NOT EXISTS assets (
    id TEXT PRIMARY KEY,
    store TEXT NOT NULL,
    app_id TEXT NOT NULL,
    app_title TEXT NOT NULL,
    type TEXT NOT NULL,
    url TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    source_url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_app ON assets(store, app_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
