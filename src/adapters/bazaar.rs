//! Cafe Bazaar storefront adapter

use super::common::{parse_storefront, StoreProfile};
use super::{AdapterError, AppFields, PageSelectors, StoreAdapter};
use crate::url::Store;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static CATEGORY_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(?:cat|category)/([A-Za-z0-9_-]+)").expect("bazaar category pattern is valid")
});

static PROFILE: StoreProfile = StoreProfile {
    store: Store::Bazaar,
    rating_keys: &["ratingvalue", "bazaar:rating"],
    count_keys: &["reviewcount", "bazaar:ratingcount"],
    installs_keys: &["bazaar:installs", "app:installs", "installs"],
    developer_keys: &["bazaar:developer", "author"],
    category_path: &CATEGORY_PATH,
};

static SELECTORS: PageSelectors = PageSelectors {
    review: "div.ReviewItem, article.review",
    review_author: ".ReviewItem__author, .review__author",
    review_rating: ".ReviewItem__rating, [itemprop=ratingValue]",
    review_title: ".ReviewItem__title, .review__title",
    review_body: ".ReviewItem__body, .review__body",
    review_date: "time, .ReviewItem__date",
    screenshot: ".ScreenshotSlider img, .screenshots img",
};

/// Bazaar serves all reviews on the detail page, so there is no supplemental fetch
pub struct BazaarAdapter;

impl BazaarAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BazaarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreAdapter for BazaarAdapter {
    fn store(&self) -> Store {
        Store::Bazaar
    }

    fn parse(&self, url: &Url, html: &str) -> Result<AppFields, AdapterError> {
        parse_storefront(&PROFILE, url, html)
    }

    fn selectors(&self) -> &PageSelectors {
        &SELECTORS
    }
}
