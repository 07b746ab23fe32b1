//! Store adapters
//!
//! An adapter knows how one storefront lays out its detail pages: which meta
//! tags carry the rating and install count, where the category links point,
//! which selectors find reviews and screenshots. Adapters can optionally fetch
//! extra reviews from pages beyond the detail page itself.
//!
//! The engine never names a store directly; it asks the [`AdapterRegistry`]
//! for the adapter owning a URL's domain. Adding a store means implementing
//! [`StoreAdapter`] and registering it.

mod bazaar;
pub mod common;
mod myket;

pub use bazaar::BazaarAdapter;
pub use myket::MyketAdapter;

use crate::url::{host_matches, Store};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors raised by store adapters
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{url} does not belong to store {store}")]
    WrongStore { store: Store, url: String },

    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Fields an adapter extracted from a detail page
///
/// Every field is optional; the pipeline merges these over the base metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub ratings_count: Option<u64>,
    pub installs: Option<u64>,
    pub developer: Option<String>,
    /// Raw category as the store reports it; resolved by the genre chain
    pub category: Option<String>,
    pub released_at: Option<String>,
    pub updated_at: Option<String>,
    pub monetization: Option<String>,
    pub feature_flags: Vec<String>,
}

fn overwrite_text(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *target = Some(value.trim().to_string());
        }
    }
}

fn overwrite<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl AppFields {
    /// Overwrites fields with every non-empty value from `other`
    pub fn merge_from(&mut self, other: AppFields) {
        overwrite_text(&mut self.title, other.title);
        overwrite_text(&mut self.description, other.description);
        overwrite(&mut self.rating, other.rating);
        overwrite(&mut self.ratings_count, other.ratings_count);
        overwrite(&mut self.installs, other.installs);
        overwrite_text(&mut self.developer, other.developer);
        overwrite_text(&mut self.category, other.category);
        overwrite_text(&mut self.released_at, other.released_at);
        overwrite_text(&mut self.updated_at, other.updated_at);
        overwrite_text(&mut self.monetization, other.monetization);
        if !other.feature_flags.is_empty() {
            self.feature_flags = other.feature_flags;
        }
    }
}

/// CSS selectors locating reviews and screenshots on a store's pages
#[derive(Debug, Clone)]
pub struct PageSelectors {
    /// One element per review
    pub review: &'static str,
    pub review_author: &'static str,
    /// Read from `data-rating`, `content` or the element text
    pub review_rating: &'static str,
    pub review_title: &'static str,
    pub review_body: &'static str,
    /// Read from `datetime` or the element text
    pub review_date: &'static str,
    /// `img` elements of the screenshot gallery
    pub screenshot: &'static str,
}

/// A review as scraped, before it is tied to a stored app
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedReview {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub title: Option<String>,
    pub body: String,
    pub created_at: Option<String>,
}

impl ScrapedReview {
    /// Key over the fields that identify a review within one app
    ///
    /// Two reviews with equal keys become the same stored record.
    pub fn content_key(&self) -> String {
        [
            self.author.as_deref().unwrap_or(""),
            self.created_at.as_deref().unwrap_or(""),
            self.title.as_deref().unwrap_or(""),
            self.body.as_str(),
        ]
        .join("\u{1f}")
    }
}

/// Capability set every storefront adapter provides
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Store this adapter handles
    fn store(&self) -> Store;

    /// Domain pattern used as the registry key
    fn domain_pattern(&self) -> &'static str {
        self.store().domain_pattern()
    }

    /// Extracts fields from a detail page; pure and synchronous
    fn parse(&self, url: &Url, html: &str) -> Result<AppFields, AdapterError>;

    /// Selectors for on-page reviews and screenshots
    fn selectors(&self) -> &PageSelectors;

    /// Whether [`StoreAdapter::fetch_supplemental_reviews`] does anything
    fn supports_supplemental_reviews(&self) -> bool {
        false
    }

    /// Fetches up to `limit` reviews not already in `known`
    ///
    /// `known` holds the reviews collected from the detail page; returned
    /// reviews never repeat one of them or each other.
    async fn fetch_supplemental_reviews(
        &self,
        _url: &Url,
        _app_id: &str,
        _client: &Client,
        _known: &[ScrapedReview],
        _limit: usize,
    ) -> Result<Vec<ScrapedReview>, AdapterError> {
        Ok(Vec::new())
    }
}

/// Startup-time table of adapters keyed by domain pattern
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<(&'static str, Arc<dyn StoreAdapter>)>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Myket and Cafe Bazaar adapters
    pub fn with_default_adapters() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MyketAdapter::new()));
        registry.register(Arc::new(BazaarAdapter::new()));
        registry
    }

    /// Adds an adapter; a later registration for the same domain replaces it
    pub fn register(&mut self, adapter: Arc<dyn StoreAdapter>) {
        let pattern = adapter.domain_pattern();
        self.adapters.retain(|(existing, _)| *existing != pattern);
        self.adapters.push((pattern, adapter));
    }

    /// Adapter owning the URL's domain
    pub fn for_url(&self, url: &Url) -> Option<Arc<dyn StoreAdapter>> {
        let host = url.host_str()?.to_lowercase();
        self.adapters
            .iter()
            .find(|(pattern, _)| host_matches(pattern, &host))
            .map(|(_, adapter)| Arc::clone(adapter))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
