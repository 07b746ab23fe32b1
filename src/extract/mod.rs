//! Detail-page extraction pipeline
//!
//! Stages run in a fixed order and each one's failure stays local:
//!
//! 1. base metadata from JSON-LD and meta tags
//! 2. store adapter fields merged over the base (adapter errors are logged)
//! 3. genre inference
//! 4. skip pages whose title is an error-page marker
//! 5. game upsert
//! 6. reviews (page selectors, structured data, optional supplemental fetch)
//! 7. icon and screenshot assets
//!
//! A failure in stage 6 or 7 never undoes the game written in stage 5.
//!
//! The synchronous stages run in [`analyze_detail_page`], which owns the
//! parsed document; [`index_detail_page`] then does the writes and any
//! network-bound enrichment.

pub mod assets;
pub mod backfill;
pub mod genre;
pub mod metadata;
pub mod reviews;

pub use backfill::{backfill_genres, BackfillReport};
pub use genre::{resolve_genre, GenreSource, ResolvedGenre, UNKNOWN_GENRE};
pub use metadata::{extract_metadata, PageMetadata};

use crate::adapters::{ScrapedReview, StoreAdapter};
use crate::config::EnrichmentConfig;
use crate::crawler::CrawlContext;
use crate::state::FrontierItem;
use crate::storage::{AssetKind, BulkOutcome, DocumentStore, GameRecord};
use crate::url::{app_id_from_url, Store};
use crate::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

/// Titles of error and rate-limit pages served with a 200 status
static ERROR_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b404\b|not found|too many requests|access denied|service unavailable|خطا|یافت نشد",
    )
    .expect("error title pattern is valid")
});

/// Everything the synchronous stages produced for one detail page
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub game: GameRecord,
    pub genre_source: GenreSource,
    pub page_reviews: Vec<ScrapedReview>,
    pub assets: Vec<(AssetKind, String)>,
}

/// Result of the synchronous stages
#[derive(Debug, Clone)]
pub enum Analysis {
    Index(Box<PageAnalysis>),
    Skip(String),
}

/// What happened to a detail page
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Indexed {
        game_id: String,
        genre: String,
        reviews: usize,
        assets: usize,
    },
    Skipped {
        reason: String,
    },
}

/// Returns the matched marker when a title looks like an error page
pub fn error_page_marker(title: &str) -> Option<&str> {
    ERROR_TITLE.find(title).map(|m| m.as_str())
}

/// Runs stages 1-4 and prepares review and asset candidates
pub fn analyze_detail_page(
    url: &Url,
    html: &str,
    item: &FrontierItem,
    adapter: Option<&dyn StoreAdapter>,
    enrichment: &EnrichmentConfig,
) -> Result<Analysis> {
    let store = match Store::from_url(url) {
        Some(store) => store,
        None => return Ok(Analysis::Skip(format!("no store serves {}", url))),
    };
    let app_id = app_id_from_url(url)?;

    let document = Html::parse_document(html);
    let metadata = extract_metadata(&document);
    let mut fields = metadata.fields.clone();

    match adapter {
        Some(adapter) => match adapter.parse(url, html) {
            Ok(extra) => fields.merge_from(extra),
            Err(e) => tracing::warn!("Adapter parse failed for {}: {}", url, e),
        },
        None => tracing::debug!("No adapter registered for {}", url),
    }

    let genre = resolve_genre(
        url,
        &metadata.breadcrumbs,
        fields.category.as_deref(),
        item.genre_hint.as_deref(),
    );

    let title = fields.title.clone().unwrap_or_default();
    if let Some(marker) = error_page_marker(&title) {
        return Ok(Analysis::Skip(format!(
            "title {:?} looks like an error page ({})",
            title, marker
        )));
    }

    let game = GameRecord {
        store,
        app_id,
        title,
        genre: genre.slug,
        rating: fields.rating,
        ratings_count: fields.ratings_count,
        installs: fields.installs,
        developer: fields.developer,
        description: fields.description.unwrap_or_default(),
        monetization: fields.monetization.unwrap_or_else(|| "unknown".to_string()),
        feature_flags: fields.feature_flags,
        released_at: fields.released_at,
        updated_at: fields.updated_at,
        indexed_at: Utc::now().to_rfc3339(),
        source_url: url.to_string(),
        source_list_url: item.source_list.clone(),
    };

    let (page_reviews, assets) = match adapter {
        Some(adapter) => {
            let selectors = adapter.selectors();
            let page_reviews = if enrichment.reviews {
                reviews::collect_page_reviews(
                    &document,
                    &metadata.reviews,
                    selectors,
                    enrichment.review_cap,
                )
            } else {
                Vec::new()
            };
            let assets = if enrichment.assets {
                assets::collect_asset_urls(&document, url, &metadata, selectors)
            } else {
                Vec::new()
            };
            (page_reviews, assets)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(Analysis::Index(Box::new(PageAnalysis {
        game,
        genre_source: genre.source,
        page_reviews,
        assets,
    })))
}

fn log_bulk_failures(kind: &str, url: &Url, outcome: &BulkOutcome) {
    if !outcome.failed.is_empty() {
        tracing::warn!(
            "{} of {} {} writes failed for {}",
            outcome.failed.len(),
            outcome.failed.len() + outcome.written,
            kind,
            url
        );
        for (id, error) in &outcome.failed {
            tracing::debug!("  {} {}: {}", kind, id, error);
        }
    }
}

/// Runs the full pipeline for one fetched detail page
pub async fn index_detail_page(
    ctx: &CrawlContext,
    url: &Url,
    html: &str,
    item: &FrontierItem,
) -> Result<DetailOutcome> {
    let enrichment = &ctx.config.enrichment;
    let adapter = ctx.registry.for_url(url);

    let analysis = match analyze_detail_page(url, html, item, adapter.as_deref(), enrichment)? {
        Analysis::Index(analysis) => *analysis,
        Analysis::Skip(reason) => return Ok(DetailOutcome::Skipped { reason }),
    };
    let PageAnalysis {
        game,
        genre_source,
        page_reviews,
        assets,
    } = analysis;

    let game_id = ctx.with_storage(|s| Ok(s.upsert_game(&game)?))?;
    tracing::debug!(
        "Indexed {} (genre {} from {:?})",
        game_id,
        game.genre,
        genre_source
    );

    let mut reviews_written = 0;
    if enrichment.reviews {
        let cap = enrichment.review_cap;
        let mut scraped = reviews::unique_reviews(page_reviews);

        if scraped.len() < cap && enrichment.supplemental_reviews {
            if let Some(adapter) = adapter.as_ref().filter(|a| a.supports_supplemental_reviews()) {
                let remaining = cap - scraped.len();
                match adapter
                    .fetch_supplemental_reviews(url, &game.app_id, &ctx.client, &scraped, remaining)
                    .await
                {
                    Ok(extra) => scraped.extend(extra),
                    Err(e) => tracing::warn!("Supplemental reviews failed for {}: {}", url, e),
                }
            }
        }

        let records = reviews::review_records(&game, scraped, cap);
        if !records.is_empty() {
            match ctx.with_storage(|s| Ok(s.upsert_reviews(&records)?)) {
                Ok(outcome) => {
                    log_bulk_failures("review", url, &outcome);
                    reviews_written = outcome.written;
                }
                Err(e) => tracing::warn!("Review write failed for {}: {}", url, e),
            }
        }
    }

    let mut assets_written = 0;
    if enrichment.assets && !assets.is_empty() {
        let records = assets::asset_records(&game, assets);
        match ctx.with_storage(|s| Ok(s.upsert_assets(&records)?)) {
            Ok(outcome) => {
                log_bulk_failures("asset", url, &outcome);
                assets_written = outcome.written;
            }
            Err(e) => tracing::warn!("Asset write failed for {}: {}", url, e),
        }
    }

    Ok(DetailOutcome::Indexed {
        game_id,
        genre: game.genre,
        reviews: reviews_written,
        assets: assets_written,
    })
}
