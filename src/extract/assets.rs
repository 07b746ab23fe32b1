//! Icon and screenshot collection for a detail page

use super::metadata::PageMetadata;
use crate::adapters::PageSelectors;
use crate::storage::{AssetKind, AssetRecord, GameRecord};
use crate::url::is_video_path;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Resolves an image reference to an absolute http(s) URL outside video paths
fn resolve(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") {
        return None;
    }
    let url = base.join(reference).ok()?;
    if !matches!(url.scheme(), "http" | "https") || is_video_path(&url) {
        return None;
    }
    Some(url.to_string())
}

/// Icon plus screenshot URLs in page order, deduplicated by (kind, url)
pub fn collect_asset_urls(
    document: &Html,
    base: &Url,
    metadata: &PageMetadata,
    selectors: &PageSelectors,
) -> Vec<(AssetKind, String)> {
    let mut candidates: Vec<(AssetKind, String)> = Vec::new();

    if let Some(icon) = metadata.image.as_deref().and_then(|i| resolve(base, i)) {
        candidates.push((AssetKind::Icon, icon));
    }

    candidates.extend(
        metadata
            .screenshots
            .iter()
            .filter_map(|s| resolve(base, s))
            .map(|url| (AssetKind::Screenshot, url)),
    );

    if let Ok(selector) = Selector::parse(selectors.screenshot) {
        candidates.extend(
            document
                .select(&selector)
                .filter_map(|img| {
                    let value = img.value();
                    value.attr("src").or_else(|| value.attr("data-src"))
                })
                .filter_map(|src| resolve(base, src))
                .map(|url| (AssetKind::Screenshot, url)),
        );
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

/// One asset record per collected URL
pub fn asset_records(game: &GameRecord, urls: Vec<(AssetKind, String)>) -> Vec<AssetRecord> {
    urls.into_iter()
        .map(|(kind, url)| AssetRecord {
            store: game.store,
            app_id: game.app_id.clone(),
            app_title: game.title.clone(),
            kind,
            url,
            indexed_at: game.indexed_at.clone(),
            source_url: game.source_url.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECTORS: PageSelectors = PageSelectors {
        review: ".r",
        review_author: ".a",
        review_rating: ".s",
        review_title: ".t",
        review_body: ".b",
        review_date: "time",
        screenshot: ".gallery img",
    };

    #[test]
    fn test_collects_icon_and_screenshots_in_order() {
        let base = Url::parse("https://myket.ir/app/com.foo").unwrap();
        let doc = Html::parse_document(
            r#"<div class="gallery">
                 <img src="/shots/1.jpg">
                 <img data-src="https://cdn.myket.ir/shots/2.jpg">
                 <img src="https://cdn.myket.ir/video/preview.jpg">
                 <img src="data:image/png;base64,AAAA">
               </div>
               <img src="/not-in-gallery.jpg">"#,
        );
        let metadata = PageMetadata {
            image: Some("https://cdn.myket.ir/icon.png".to_string()),
            screenshots: vec!["https://cdn.myket.ir/shots/2.jpg".to_string()],
            ..PageMetadata::default()
        };

        let assets = collect_asset_urls(&doc, &base, &metadata, &SELECTORS);

        assert_eq!(
            assets,
            vec![
                (AssetKind::Icon, "https://cdn.myket.ir/icon.png".to_string()),
                (AssetKind::Screenshot, "https://cdn.myket.ir/shots/2.jpg".to_string()),
                (AssetKind::Screenshot, "https://myket.ir/shots/1.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn test_same_url_as_icon_and_screenshot_kept_twice() {
        let base = Url::parse("https://myket.ir/app/com.foo").unwrap();
        let metadata = PageMetadata {
            image: Some("/img.png".to_string()),
            screenshots: vec!["/img.png".to_string(), "/img.png".to_string()],
            ..PageMetadata::default()
        };
        let assets = collect_asset_urls(&Html::parse_document(""), &base, &metadata, &SELECTORS);
        assert_eq!(assets.len(), 2);
    }
}
