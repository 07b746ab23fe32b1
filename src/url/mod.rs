//! URL handling for the storefront crawler
//!
//! This module provides URL normalization, store identification by domain,
//! app id extraction, and the detail/list/irrelevant classification that
//! routes every fetched page.

mod domain;
mod normalize;

pub use domain::{extract_domain, host_matches, same_site};
pub use normalize::{normalize_parsed, normalize_url};

use crate::UrlError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Detail pages live at `/app/<package>` on both storefronts
static DETAIL_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/app/([A-Za-z0-9._-]+)$").expect("detail path pattern is valid")
});

/// Loose app id pattern used anywhere in a URL
static APP_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/app/([A-Za-z0-9._-]+)").expect("app id pattern is valid"));

/// Known storefronts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    Myket,
    Bazaar,
}

impl Store {
    pub const ALL: [Store; 2] = [Store::Myket, Store::Bazaar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Myket => "myket",
            Self::Bazaar => "bazaar",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "myket" => Some(Self::Myket),
            "bazaar" => Some(Self::Bazaar),
            _ => None,
        }
    }

    /// Domain pattern owned by this store
    pub fn domain_pattern(&self) -> &'static str {
        match self {
            Self::Myket => "*.myket.ir",
            Self::Bazaar => "*.cafebazaar.ir",
        }
    }

    /// Identifies the store serving a host
    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|store| host_matches(store.domain_pattern(), &host))
    }

    /// Identifies the store serving a URL
    pub fn from_url(url: &Url) -> Option<Self> {
        url.host_str().and_then(Self::from_host)
    }

    /// Path substrings that mark listing/category pages
    fn list_markers(&self) -> &'static [&'static str] {
        match self {
            Self::Myket => &["/games", "/list/", "/apps/"],
            Self::Bazaar => &["/cat/", "/category/", "/pages/", "/lists/"],
        }
    }

    /// Leading path segment that carries a category slug
    fn category_segment(&self) -> &'static str {
        match self {
            Self::Myket => "games",
            Self::Bazaar => "cat",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page classification used to route fetched URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    /// One application's listing page
    Detail,
    /// Category, listing or search page whose value is its links
    List,
    /// Anything else; dropped
    Irrelevant,
}

/// Returns true for video pages, which are never crawled
pub fn is_video_path(url: &Url) -> bool {
    url.path().contains("/video/")
}

/// Classifies an absolute URL as detail, list or irrelevant
///
/// Pure function of the URL: the store is chosen by host, detail pages match
/// `/app/<package>`, list pages contain one of the store's listing markers.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use storefront_crawler::url::{classify_url, UrlKind};
///
/// let list = Url::parse("https://cafebazaar.ir/cat/strategy").unwrap();
/// assert_eq!(classify_url(&list), UrlKind::List);
///
/// let app = Url::parse("https://myket.ir/app/com.foo.bar").unwrap();
/// assert_eq!(classify_url(&app), UrlKind::Detail);
/// ```
pub fn classify_url(url: &Url) -> UrlKind {
    let store = match Store::from_url(url) {
        Some(store) => store,
        None => return UrlKind::Irrelevant,
    };

    if is_video_path(url) {
        return UrlKind::Irrelevant;
    }

    let path = url.path().trim_end_matches('/');
    if DETAIL_PATH.is_match(path) {
        return UrlKind::Detail;
    }

    if store
        .list_markers()
        .iter()
        .any(|marker| path.contains(marker))
    {
        return UrlKind::List;
    }

    UrlKind::Irrelevant
}

/// Extracts the package name from an `/app/<package>` URL
pub fn app_id_from_url(url: &Url) -> Result<String, UrlError> {
    APP_ID
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| UrlError::MissingAppId(url.to_string()))
}

/// Returns the raw category slug carried by a store's category path
///
/// `https://myket.ir/games/action/top` yields `(Myket, "action")`,
/// `https://cafebazaar.ir/cat/word-trivia?page=2` yields `(Bazaar, "word-trivia")`.
pub fn category_slug(url: &Url) -> Option<(Store, String)> {
    let store = Store::from_url(url)?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    if segments.next()? != store.category_segment() {
        return None;
    }
    let slug = segments.next()?.to_lowercase();
    Some((store, slug))
}
