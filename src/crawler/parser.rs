//! Link extraction for fetched storefront pages
//!
//! Turns a page into two ordered, deduplicated link lists: detail pages and
//! list pages. Detail links carry the genre hint inherited from the page they
//! were found on.

use crate::extract::genre::genre_hint_for;
use crate::state::FrontierItem;
use crate::url::{classify_url, is_video_path, normalize_parsed, same_site, Store, UrlKind};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Permissive anchor scan for markup the HTML parser yields nothing from
static RAW_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"']+)["']"#).expect("anchor pattern is valid")
});

/// Links harvested from one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLinks {
    /// Detail pages, in page order
    pub details: Vec<FrontierItem>,
    /// List pages, in page order
    pub lists: Vec<FrontierItem>,
}

/// Extracts typed links from a fetched page
///
/// # Link Rules
///
/// - relative hrefs are resolved against `page_url`
/// - fragments, repeated slashes and tracking parameters are normalized away
/// - only Myket and Cafe Bazaar hosts are kept, and only `page_url`'s own
///   host when `same_domain_only` is set
/// - video pages are dropped
/// - `javascript:`, `mailto:`, `tel:` and data URIs are skipped
///
/// Detail links inherit the category slug of `page_url`, or `inherited_hint`
/// when the page URL carries none. Both lists record `page_url` as their
/// source list.
///
/// # Example
///
/// ```
/// use storefront_crawler::crawler::extract_links;
/// use url::Url;
///
/// let page = Url::parse("https://cafebazaar.ir/cat/strategy").unwrap();
/// let html = r#"<a href="/app/com.empire">Empire</a><a href="/cat/strategy?page=2">2</a>"#;
/// let links = extract_links(html, &page, None, false);
///
/// assert_eq!(links.details[0].url, "https://cafebazaar.ir/app/com.empire");
/// assert_eq!(links.details[0].genre_hint.as_deref(), Some("strategy"));
/// assert_eq!(links.lists[0].url, "https://cafebazaar.ir/cat/strategy?page=2");
/// ```
pub fn extract_links(
    html: &str,
    page_url: &Url,
    inherited_hint: Option<&str>,
    same_domain_only: bool,
) -> PageLinks {
    let hint = genre_hint_for(page_url).or_else(|| inherited_hint.map(str::to_string));
    let source = Some(page_url.to_string());

    let mut links = PageLinks::default();
    let mut seen = HashSet::new();

    for href in anchor_hrefs(html) {
        let link = match resolve_link(&href, page_url) {
            Some(link) => link,
            None => continue,
        };

        if Store::from_url(&link).is_none() || is_video_path(&link) {
            continue;
        }
        if same_domain_only && !same_site(page_url, &link) {
            continue;
        }

        let kind = classify_url(&link);
        if kind == UrlKind::Irrelevant || !seen.insert(link.to_string()) {
            continue;
        }

        match kind {
            UrlKind::Detail => links.details.push(FrontierItem {
                url: link.to_string(),
                genre_hint: hint.clone(),
                source_list: source.clone(),
            }),
            UrlKind::List => links.lists.push(FrontierItem {
                url: link.to_string(),
                genre_hint: None,
                source_list: source.clone(),
            }),
            UrlKind::Irrelevant => {}
        }
    }

    links
}

/// `href` values of every anchor, via the HTML parser or the regex fallback
fn anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut hrefs = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        hrefs.extend(
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("href"))
                .map(str::to_string),
        );
    }

    if hrefs.is_empty() {
        hrefs.extend(
            RAW_ANCHOR
                .captures_iter(html)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        );
    }

    hrefs
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    Some(normalize_parsed(absolute))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    fn urls(items: &[FrontierItem]) -> Vec<&str> {
        items.iter().map(|i| i.url.as_str()).collect()
    }

    #[test]
    fn test_detail_and_list_links_split() {
        let html = r#"
            <a href="/app/com.b">B</a>
            <a href="/app/com.a">A</a>
            <a href="/app/com.b#reviews">B again</a>
            <a href="/cat/action">Action</a>
            <a href="https://cafebazaar.ir/about">About</a>
        "#;
        let links = extract_links(html, &page("https://cafebazaar.ir/cat/strategy"), None, false);

        assert_eq!(
            urls(&links.details),
            vec!["https://cafebazaar.ir/app/com.b", "https://cafebazaar.ir/app/com.a"]
        );
        assert_eq!(urls(&links.lists), vec!["https://cafebazaar.ir/cat/action"]);
        assert!(links
            .details
            .iter()
            .all(|d| d.genre_hint.as_deref() == Some("strategy")));
        assert_eq!(
            links.details[0].source_list.as_deref(),
            Some("https://cafebazaar.ir/cat/strategy")
        );
        assert_eq!(links.lists[0].genre_hint, None);
    }

    #[test]
    fn test_hint_falls_back_to_inherited() {
        let html = r#"<a href="/app/com.a">A</a>"#;
        let links = extract_links(html, &page("https://myket.ir/list/top"), Some("racing"), false);
        assert_eq!(links.details[0].genre_hint.as_deref(), Some("racing"));

        let links = extract_links(html, &page("https://myket.ir/list/top"), None, false);
        assert_eq!(links.details[0].genre_hint, None);
    }

    #[test]
    fn test_bazaar_slug_mapped_for_hint() {
        let html = r#"<a href="/app/com.quiz">Q</a>"#;
        let links = extract_links(html, &page("https://cafebazaar.ir/cat/word-trivia"), None, false);
        assert_eq!(links.details[0].genre_hint.as_deref(), Some("word_trivia"));
    }

    #[test]
    fn test_foreign_and_video_links_dropped() {
        let html = r##"
            <a href="https://example.com/app/com.x">foreign</a>
            <a href="/video/app/com.y">video</a>
            <a href="javascript:void(0)">js</a>
            <a href="mailto:info@myket.ir">mail</a>
            <a href="#top">top</a>
            <a href="https://myket.ir//app//com.z/">doubled</a>
        "##;
        let links = extract_links(html, &page("https://myket.ir/games"), None, false);
        assert_eq!(urls(&links.details), vec!["https://myket.ir/app/com.z"]);
        assert!(links.lists.is_empty());
    }

    #[test]
    fn test_same_domain_only() {
        let html = r#"
            <a href="https://cafebazaar.ir/app/com.a">bazaar</a>
            <a href="https://myket.ir/app/com.b">myket</a>
        "#;
        let page_url = page("https://myket.ir/games/action");

        let open = extract_links(html, &page_url, None, false);
        assert_eq!(open.details.len(), 2);

        let restricted = extract_links(html, &page_url, None, true);
        assert_eq!(urls(&restricted.details), vec!["https://myket.ir/app/com.b"]);
    }

    #[test]
    fn test_same_domain_only_keeps_www_variant() {
        let html = r#"<a href="https://www.myket.ir/app/com.w">www</a>"#;
        let links = extract_links(html, &page("https://myket.ir/games/action"), None, true);
        assert_eq!(urls(&links.details), vec!["https://www.myket.ir/app/com.w"]);
    }

    #[test]
    fn test_regex_fallback_on_unparseable_anchors() {
        // Anchors inside script text are not elements
        let html = r#"<script>var t = '<a href="/app/com.hidden">x</a>';</script>"#;
        let links = extract_links(html, &page("https://myket.ir/games"), None, false);
        assert_eq!(urls(&links.details), vec!["https://myket.ir/app/com.hidden"]);
    }

    #[test]
    fn test_empty_page() {
        let links = extract_links("", &page("https://myket.ir/games"), None, false);
        assert_eq!(links, PageLinks::default());
    }
}
