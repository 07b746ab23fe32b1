//! Parsing helpers shared by the storefront adapters
//!
//! Both storefronts publish the same kinds of hints (meta tags, category
//! links, `<time>` elements, Persian-formatted numbers), so the adapters
//! differ only in which keys and selectors they look at.

use super::{AdapterError, AppFields, PageSelectors, ScrapedReview};
use crate::url::Store;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Install counts written in running text, e.g. `نصب: ۱۰۰ هزار+` or `installs 5M`
static INSTALLS_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:نصب|install)[^0-9۰-۹]{0,10}([0-9۰-۹٬,\.kKmM]+(?:\s*(?:هزار|میلیون))?)")
        .expect("installs pattern is valid")
});

/// Per-store knobs for [`parse_storefront`]
pub struct StoreProfile {
    pub store: Store,
    pub rating_keys: &'static [&'static str],
    pub count_keys: &'static [&'static str],
    pub installs_keys: &'static [&'static str],
    pub developer_keys: &'static [&'static str],
    /// Matched against the path of same-store links; group 1 is the slug
    pub category_path: &'static Lazy<Regex>,
}

/// Lower-cased `name`/`property` → `content` map of a page's meta tags
///
/// The first occurrence of a key wins.
#[derive(Debug, Default)]
pub struct MetaTags(HashMap<String, String>);

impl MetaTags {
    pub fn from_document(document: &Html) -> Self {
        let mut tags = HashMap::new();
        if let Ok(selector) = Selector::parse("meta[content]") {
            for element in document.select(&selector) {
                let value = element.value();
                let key = value.attr("name").or_else(|| value.attr("property"));
                if let (Some(key), Some(content)) = (key, value.attr("content")) {
                    tags.entry(key.trim().to_lowercase())
                        .or_insert_with(|| content.trim().to_string());
                }
            }
        }
        Self(tags)
    }

    /// First non-empty value among `keys`
    pub fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !value.is_empty())
            .cloned()
    }
}

/// Maps Persian and Arabic-Indic digits to ASCII and drops thousands separators
pub fn normalize_digits(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '٬')
        .map(|c| match c {
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            '٫' => '.',
            other => other,
        })
        .collect()
}

/// Parses a rating such as `4.5`, `۴٫۵` or `4,5`
pub fn parse_rating(s: &str) -> Option<f64> {
    let normalized = normalize_digits(s).replace(',', ".");
    let value: f64 = normalized.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a count by keeping only its digits (`۱٬۲۳۴ نظر` → 1234)
pub fn parse_count(s: &str) -> Option<u64> {
    let digits: String = normalize_digits(s)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parses an install count with `k`/`m` or Persian multiplier words
pub fn parse_installs(s: &str) -> Option<u64> {
    let text = normalize_digits(s).to_lowercase().replace(',', "");
    let multiplier = if text.contains('m') || text.contains("میلیون") {
        1_000_000.0
    } else if text.contains('k') || text.contains("هزار") {
        1_000.0
    } else {
        1.0
    };

    let number: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Flags derived from the description text
pub fn feature_flags(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    let mut flags = Vec::new();
    if description.contains("آفلاین") || lower.contains("offline") {
        flags.push("offline".to_string());
    }
    if description.contains("جدول برتر") || lower.contains("leaderboard") {
        flags.push("leaderboard".to_string());
    }
    flags
}

/// `free` when the advertised price is zero, `paid` otherwise
pub fn monetization(meta: &MetaTags) -> Option<String> {
    let price = meta.first(&["price", "product:price:amount", "og:price:amount"])?;
    let normalized = normalize_digits(&price);
    let free = normalized
        .trim()
        .parse::<f64>()
        .map(|p| p == 0.0)
        .unwrap_or(false);
    Some(if free { "free" } else { "paid" }.to_string())
}

/// `datetime` attribute of the first `<time>` element
pub fn time_datetime(document: &Html) -> Option<String> {
    let selector = Selector::parse("time[datetime]").ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("datetime"))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// First category slug linked from the page, restricted to the store's own host
pub fn category_link(document: &Html, base: &Url, store: Store, path: &Regex) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|link| Store::from_url(link) == Some(store))
        .find_map(|link| {
            path.captures(link.path())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_lowercase())
        })
}

fn installs(meta: &MetaTags, keys: &[&str], html: &str) -> Option<u64> {
    keys.iter()
        .filter_map(|key| meta.first(&[*key]))
        .find_map(|value| parse_installs(&value))
        .or_else(|| {
            INSTALLS_IN_TEXT
                .captures(html)
                .and_then(|caps| caps.get(1))
                .and_then(|m| parse_installs(m.as_str()))
        })
}

/// Meta-tag driven field extraction common to both storefronts
pub fn parse_storefront(
    profile: &StoreProfile,
    url: &Url,
    html: &str,
) -> Result<AppFields, AdapterError> {
    if Store::from_url(url) != Some(profile.store) {
        return Err(AdapterError::WrongStore {
            store: profile.store,
            url: url.to_string(),
        });
    }

    let document = Html::parse_document(html);
    let meta = MetaTags::from_document(&document);

    let description = meta.first(&["description", "og:description"]);
    let flags = description.as_deref().map(feature_flags).unwrap_or_default();

    Ok(AppFields {
        title: meta.first(&["og:title", "title"]),
        rating: meta
            .first(profile.rating_keys)
            .and_then(|v| parse_rating(&v)),
        ratings_count: meta.first(profile.count_keys).and_then(|v| parse_count(&v)),
        installs: installs(&meta, profile.installs_keys, html),
        developer: meta.first(profile.developer_keys),
        category: category_link(&document, url, profile.store, profile.category_path),
        released_at: None,
        updated_at: time_datetime(&document),
        monetization: monetization(&meta),
        feature_flags: flags,
        description,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_match<'a>(scope: ElementRef<'a>, selector: &Option<Selector>) -> Option<ElementRef<'a>> {
    selector.as_ref().and_then(|s| scope.select(s).next())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Scrapes up to `limit` reviews from raw page HTML
pub fn scrape_reviews(html: &str, selectors: &PageSelectors, limit: usize) -> Vec<ScrapedReview> {
    scrape_reviews_in(&Html::parse_document(html), selectors, limit)
}

/// Scrapes up to `limit` reviews from a parsed page using the store's selectors
///
/// Review blocks without body text are skipped. Unparseable selectors yield
/// no reviews rather than an error.
pub fn scrape_reviews_in(
    document: &Html,
    selectors: &PageSelectors,
    limit: usize,
) -> Vec<ScrapedReview> {
    if limit == 0 {
        return Vec::new();
    }

    let container = match Selector::parse(selectors.review) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };
    let author_sel = Selector::parse(selectors.review_author).ok();
    let rating_sel = Selector::parse(selectors.review_rating).ok();
    let title_sel = Selector::parse(selectors.review_title).ok();
    let body_sel = Selector::parse(selectors.review_body).ok();
    let date_sel = Selector::parse(selectors.review_date).ok();

    let mut reviews = Vec::new();

    for block in document.select(&container) {
        let text = match first_match(block, &body_sel).map(element_text).and_then(non_empty) {
            Some(text) => text,
            None => continue,
        };

        let rating = first_match(block, &rating_sel).and_then(|el| {
            el.value()
                .attr("data-rating")
                .or_else(|| el.value().attr("content"))
                .map(str::to_string)
                .or_else(|| non_empty(element_text(el)))
                .and_then(|v| parse_rating(&v))
        });

        let created_at = first_match(block, &date_sel).and_then(|el| {
            el.value()
                .attr("datetime")
                .map(str::to_string)
                .or_else(|| non_empty(element_text(el)))
        });

        reviews.push(ScrapedReview {
            author: first_match(block, &author_sel).map(element_text).and_then(non_empty),
            rating,
            title: first_match(block, &title_sel).map(element_text).and_then(non_empty),
            body: text,
            created_at,
        });

        if reviews.len() >= limit {
            break;
        }
    }

    reviews
}
