//! Document records written by the crawler
//!
//! Every record has a deterministic id so that re-crawling the same content
//! always upserts the same document.

use crate::url::Store;
use sha2::{Digest, Sha256};

/// Field separator for content hashes; cannot appear in scraped text fields
const HASH_SEPARATOR: &[u8] = &[0x1f];

/// One application listing
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub store: Store,
    pub app_id: String,
    pub title: String,
    pub genre: String,
    pub rating: Option<f64>,
    pub ratings_count: Option<u64>,
    pub installs: Option<u64>,
    pub developer: Option<String>,
    pub description: String,
    pub monetization: String,
    pub feature_flags: Vec<String>,
    pub released_at: Option<String>,
    pub updated_at: Option<String>,
    pub indexed_at: String,
    pub source_url: String,
    pub source_list_url: Option<String>,
}

impl GameRecord {
    pub fn id(&self) -> String {
        game_id(self.store, &self.app_id)
    }
}

/// One user review of an application
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub store: Store,
    pub app_id: String,
    pub app_title: String,
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub title: Option<String>,
    pub body: String,
    pub created_at: Option<String>,
    pub indexed_at: String,
    pub source_url: String,
}

impl ReviewRecord {
    pub fn id(&self) -> String {
        review_id(
            self.store,
            &self.app_id,
            self.author.as_deref(),
            self.created_at.as_deref(),
            self.title.as_deref(),
            &self.body,
        )
    }
}

/// Image kinds collected from detail pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Icon,
    Screenshot,
}

impl AssetKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Icon => "icon",
            Self::Screenshot => "screenshot",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "icon" => Some(Self::Icon),
            "screenshot" => Some(Self::Screenshot),
            _ => None,
        }
    }
}

/// One image attached to an application
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub store: Store,
    pub app_id: String,
    pub app_title: String,
    pub kind: AssetKind,
    pub url: String,
    pub indexed_at: String,
    pub source_url: String,
}

impl AssetRecord {
    pub fn id(&self) -> String {
        asset_id(self.store, &self.app_id, self.kind, &self.url)
    }
}

/// Result of a batched write; failed items never abort the batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub written: usize,
    /// (record id, error message)
    pub failed: Vec<(String, String)>,
}

/// Game identity: one document per store and package name
pub fn game_id(store: Store, app_id: &str) -> String {
    format!("{}:{}", store.as_str(), app_id)
}

/// Review identity: hash of everything that makes a review distinct
pub fn review_id(
    store: Store,
    app_id: &str,
    author: Option<&str>,
    created_at: Option<&str>,
    title: Option<&str>,
    body: &str,
) -> String {
    content_hash(&[
        store.as_str(),
        app_id,
        author.unwrap_or(""),
        created_at.unwrap_or(""),
        title.unwrap_or(""),
        body,
    ])
}

/// Asset identity: hash of the owning app, kind and image URL
pub fn asset_id(store: Store, app_id: &str, kind: AssetKind, url: &str) -> String {
    content_hash(&[store.as_str(), app_id, kind.to_db_string(), url])
}

fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(HASH_SEPARATOR);
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_is_pure() {
        assert_eq!(game_id(Store::Myket, "com.foo"), "myket:com.foo");
        assert_eq!(
            game_id(Store::Bazaar, "com.foo"),
            game_id(Store::Bazaar, "com.foo")
        );
        assert_ne!(
            game_id(Store::Bazaar, "com.foo"),
            game_id(Store::Myket, "com.foo")
        );
    }

    #[test]
    fn test_review_id_stable_for_identical_content() {
        let a = review_id(
            Store::Myket,
            "com.foo",
            Some("Ali"),
            Some("1402-01-01"),
            None,
            "عالی بود",
        );
        let b = review_id(
            Store::Myket,
            "com.foo",
            Some("Ali"),
            Some("1402-01-01"),
            None,
            "عالی بود",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_review_id_changes_with_content() {
        let a = review_id(Store::Myket, "com.foo", Some("Ali"), None, None, "good");
        let b = review_id(Store::Myket, "com.foo", Some("Ali"), None, None, "great");
        let c = review_id(Store::Myket, "com.foo", Some("Sara"), None, None, "good");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_fields_do_not_run_together() {
        let a = review_id(Store::Myket, "com.foo", Some("ab"), None, None, "c");
        let b = review_id(Store::Myket, "com.foo", Some("a"), None, None, "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_asset_id_depends_on_kind() {
        let url = "https://cdn.myket.ir/image/1.png";
        assert_ne!(
            asset_id(Store::Myket, "com.foo", AssetKind::Icon, url),
            asset_id(Store::Myket, "com.foo", AssetKind::Screenshot, url)
        );
    }
}
