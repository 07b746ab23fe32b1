//! Myket storefront adapter

use super::common::{parse_storefront, scrape_reviews, StoreProfile};
use super::{AdapterError, AppFields, PageSelectors, ScrapedReview, StoreAdapter};
use crate::url::Store;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use url::Url;

/// Review pages fetched at most per app
const MAX_REVIEW_PAGES: u32 = 10;

static CATEGORY_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/games/([A-Za-z0-9_-]+)").expect("myket category pattern is valid")
});

static PROFILE: StoreProfile = StoreProfile {
    store: Store::Myket,
    rating_keys: &["ratingvalue", "myket:rating"],
    count_keys: &["ratingcount", "myket:ratingcount"],
    installs_keys: &["myket:installs", "app:installs", "installs"],
    developer_keys: &["myket:developer", "author"],
    category_path: &CATEGORY_PATH,
};

static SELECTORS: PageSelectors = PageSelectors {
    review: "div.review-item, li.comment-item",
    review_author: ".review-author, .comment-author",
    review_rating: ".review-rating, [itemprop=ratingValue]",
    review_title: ".review-title",
    review_body: ".review-text, .comment-text",
    review_date: "time, .review-date",
    screenshot: ".screenshots img, img.screenshot",
};

pub struct MyketAdapter;

impl MyketAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MyketAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// `/app/<id>/reviews?page=N` on the detail page's origin
fn review_page_url(detail: &Url, app_id: &str, page: u32) -> Result<Url, AdapterError> {
    let mut url = detail.join(&format!("/app/{}/reviews", app_id))?;
    url.query_pairs_mut().append_pair("page", &page.to_string());
    Ok(url)
}

#[async_trait]
impl StoreAdapter for MyketAdapter {
    fn store(&self) -> Store {
        Store::Myket
    }

    fn parse(&self, url: &Url, html: &str) -> Result<AppFields, AdapterError> {
        parse_storefront(&PROFILE, url, html)
    }

    fn selectors(&self) -> &PageSelectors {
        &SELECTORS
    }

    fn supports_supplemental_reviews(&self) -> bool {
        true
    }

    async fn fetch_supplemental_reviews(
        &self,
        url: &Url,
        app_id: &str,
        client: &Client,
        known: &[ScrapedReview],
        limit: usize,
    ) -> Result<Vec<ScrapedReview>, AdapterError> {
        let mut seen: HashSet<String> = known.iter().map(ScrapedReview::content_key).collect();
        let mut reviews = Vec::new();

        for page in 1..=MAX_REVIEW_PAGES {
            if reviews.len() >= limit {
                break;
            }

            let page_url = review_page_url(url, app_id, page)?;
            let response = client
                .get(page_url.clone())
                .send()
                .await
                .map_err(|source| AdapterError::Http {
                    url: page_url.to_string(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                // Running past the last review page is normal
                if page > 1 {
                    break;
                }
                return Err(AdapterError::Status {
                    url: page_url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.map_err(|source| AdapterError::Http {
                url: page_url.to_string(),
                source,
            })?;

            // Early pages repeat the detail page's reviews, so take the whole
            // page and keep only unseen ones
            let batch = scrape_reviews(&body, &SELECTORS, usize::MAX);
            if batch.is_empty() {
                break;
            }

            let before = reviews.len();
            for review in batch {
                if reviews.len() >= limit {
                    break;
                }
                if seen.insert(review.content_key()) {
                    reviews.push(review);
                }
            }
            tracing::debug!(
                "Fetched {} new reviews from {}",
                reviews.len() - before,
                page_url
            );
        }

        Ok(reviews)
    }
}
