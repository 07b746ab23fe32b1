//! Genre inference chain
//!
//! One canonical slug per detail page, taken from the first stage that
//! produces something:
//!
//! 1. breadcrumb terms (deepest first) through the Persian term dictionary
//! 2. the category reported by the page metadata or store adapter
//! 3. the genre hint inherited from the discovering list page
//! 4. the category slug in the page URL through the store slug dictionary
//! 5. `unknown`

use crate::url::{category_slug, Store};
use url::Url;

/// Fallback genre when nothing else resolves
pub const UNKNOWN_GENRE: &str = "unknown";

/// Genres the index uses as-is
const CANONICAL_SLUGS: &[&str] = &[
    "action",
    "adventure",
    "arcade",
    "board",
    "card",
    "casual",
    "educational",
    "kids",
    "music",
    "puzzle",
    "racing",
    "role_playing",
    "simulation",
    "sports",
    "strategy",
    "trivia",
    "word",
    "word_trivia",
];

/// Persian category names as they appear in store breadcrumbs
const PERSIAN_TERMS: &[(&str, &str)] = &[
    ("اکشن", "action"),
    ("ماجرایی", "adventure"),
    ("معمایی", "puzzle"),
    ("پازل", "puzzle"),
    ("استراتژی", "strategy"),
    ("استراتژیک", "strategy"),
    ("مسابقه‌ای", "racing"),
    ("مسابقه ای", "racing"),
    ("ورزشی", "sports"),
    ("شبیه‌سازی", "simulation"),
    ("شبیه سازی", "simulation"),
    ("کودکانه", "kids"),
    ("کودک", "kids"),
    ("تفننی", "casual"),
    ("کلمات", "word"),
    ("کلمات و دانستنی‌ها", "word_trivia"),
    ("تخته‌ای", "board"),
    ("تخته ای", "board"),
    ("آرکید", "arcade"),
    ("نقش‌آفرینی", "role_playing"),
    ("نقش آفرینی", "role_playing"),
    ("کارتی", "card"),
    ("موسیقی", "music"),
    ("آموزشی", "educational"),
];

const MYKET_SLUGS: &[(&str, &str)] = &[
    ("action", "action"),
    ("adventure", "adventure"),
    ("casual", "casual"),
    ("kids", "kids"),
    ("puzzle", "puzzle"),
    ("racing", "racing"),
    ("simulation", "simulation"),
    ("sports", "sports"),
    ("strategy", "strategy"),
    ("word", "word"),
    ("board", "board"),
];

const BAZAAR_SLUGS: &[(&str, &str)] = &[
    ("strategy", "strategy"),
    ("action", "action"),
    ("arcade", "arcade"),
    ("casual", "casual"),
    ("racing", "racing"),
    ("simulation", "simulation"),
    ("word-trivia", "word_trivia"),
    ("kids-games", "kids"),
    ("puzzle", "puzzle"),
    ("sports-game", "sports"),
    ("board", "board"),
];

/// Category values that say nothing about the genre
const GENERIC_CATEGORIES: &[&str] = &[
    "",
    "unknown",
    "application",
    "game",
    "games",
    "gameapplication",
    "mobileapplication",
    "softwareapplication",
];

/// Stage of the chain that produced a genre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreSource {
    Breadcrumb,
    Category,
    Hint,
    UrlSlug,
    Unknown,
}

/// Resolved genre and the stage it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGenre {
    pub slug: String,
    pub source: GenreSource,
}

fn clean(term: &str) -> String {
    term.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation() || "،؛؟«»".contains(c))
        .to_lowercase()
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Maps a breadcrumb term to a canonical slug
///
/// Canonical slugs pass through; anything else must be in the Persian
/// dictionary. Case-insensitive, surrounding whitespace and punctuation
/// ignored.
pub fn normalize_term(term: &str) -> Option<String> {
    let cleaned = clean(term);
    if cleaned.is_empty() {
        return None;
    }
    if CANONICAL_SLUGS.contains(&cleaned.as_str()) {
        return Some(cleaned);
    }
    lookup(PERSIAN_TERMS, &cleaned).map(str::to_string)
}

/// Maps a store's own category slug; unmapped slugs pass through unchanged
pub fn map_store_slug(store: Store, slug: &str) -> String {
    let slug = slug.to_lowercase();
    let table = match store {
        Store::Myket => MYKET_SLUGS,
        Store::Bazaar => BAZAAR_SLUGS,
    };
    lookup(table, &slug)
        .map(str::to_string)
        .unwrap_or(slug)
}

/// Genre a list page passes to the detail links found on it
pub fn genre_hint_for(url: &Url) -> Option<String> {
    category_slug(url).map(|(store, slug)| map_store_slug(store, &slug))
}

fn from_category(store: Option<Store>, category: &str) -> Option<String> {
    let cleaned = clean(category);
    if GENERIC_CATEGORIES.contains(&cleaned.as_str()) {
        return None;
    }
    if let Some(slug) = normalize_term(&cleaned) {
        return Some(slug);
    }
    Some(match store {
        Some(store) => map_store_slug(store, &cleaned),
        None => cleaned,
    })
}

/// Runs the inference chain for one detail page
///
/// `breadcrumbs` are ordered from the root to the page, so the deepest
/// recognized crumb wins.
pub fn resolve_genre(
    url: &Url,
    breadcrumbs: &[String],
    category: Option<&str>,
    hint: Option<&str>,
) -> ResolvedGenre {
    let resolved = |slug: String, source| ResolvedGenre { slug, source };

    if let Some(slug) = breadcrumbs.iter().rev().find_map(|t| normalize_term(t)) {
        return resolved(slug, GenreSource::Breadcrumb);
    }

    if let Some(slug) = category.and_then(|c| from_category(Store::from_url(url), c)) {
        return resolved(slug, GenreSource::Category);
    }

    if let Some(hint) = hint.map(clean).filter(|h| !h.is_empty() && h.as_str() != UNKNOWN_GENRE) {
        return resolved(hint, GenreSource::Hint);
    }

    if let Some(slug) = genre_hint_for(url) {
        return resolved(slug, GenreSource::UrlSlug);
    }

    resolved(UNKNOWN_GENRE.to_string(), GenreSource::Unknown)
}
