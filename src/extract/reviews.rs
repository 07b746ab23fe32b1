//! Review collection for a detail page

use crate::adapters::common::scrape_reviews_in;
use crate::adapters::{PageSelectors, ScrapedReview};
use crate::storage::{GameRecord, ReviewRecord};
use scraper::Html;
use std::collections::HashSet;

/// Reviews found on the detail page itself, selector matches first
///
/// Structured-data reviews fill in after the selector matches; the result
/// never exceeds `cap`.
pub fn collect_page_reviews(
    document: &Html,
    structured: &[ScrapedReview],
    selectors: &PageSelectors,
    cap: usize,
) -> Vec<ScrapedReview> {
    let mut reviews = scrape_reviews_in(document, selectors, cap);
    let remaining = cap.saturating_sub(reviews.len());
    reviews.extend(structured.iter().take(remaining).cloned());
    reviews
}

/// Drops repeated reviews, keeping the first of each
pub fn unique_reviews(scraped: Vec<ScrapedReview>) -> Vec<ScrapedReview> {
    let mut seen = HashSet::new();
    scraped
        .into_iter()
        .filter(|review| seen.insert(review.content_key()))
        .collect()
}

/// Turns scraped reviews into records owned by `game`
///
/// Records are deduplicated by content id, keeping the first occurrence, and
/// truncated to `cap`.
pub fn review_records(game: &GameRecord, scraped: Vec<ScrapedReview>, cap: usize) -> Vec<ReviewRecord> {
    let mut seen = HashSet::new();

    scraped
        .into_iter()
        .map(|review| ReviewRecord {
            store: game.store,
            app_id: game.app_id.clone(),
            app_title: game.title.clone(),
            author: review.author,
            rating: review.rating,
            title: review.title,
            body: review.body,
            created_at: review.created_at,
            indexed_at: game.indexed_at.clone(),
            source_url: game.source_url.clone(),
        })
        .filter(|record| seen.insert(record.id()))
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::Store;

    const SELECTORS: PageSelectors = PageSelectors {
        review: ".r",
        review_author: ".a",
        review_rating: ".s",
        review_title: ".t",
        review_body: ".b",
        review_date: "time",
        screenshot: "img",
    };

    fn scraped(author: &str, body: &str) -> ScrapedReview {
        ScrapedReview {
            author: Some(author.to_string()),
            rating: Some(4.0),
            title: None,
            body: body.to_string(),
            created_at: None,
        }
    }

    fn game() -> GameRecord {
        GameRecord {
            store: Store::Bazaar,
            app_id: "com.foo".to_string(),
            title: "Foo".to_string(),
            genre: "puzzle".to_string(),
            rating: None,
            ratings_count: None,
            installs: None,
            developer: None,
            description: String::new(),
            monetization: "unknown".to_string(),
            feature_flags: Vec::new(),
            released_at: None,
            updated_at: None,
            indexed_at: "2024-01-01T00:00:00Z".to_string(),
            source_url: "https://cafebazaar.ir/app/com.foo".to_string(),
            source_list_url: None,
        }
    }

    #[test]
    fn test_page_reviews_then_structured_within_cap() {
        let doc = Html::parse_document(
            r#"<div class="r"><span class="a">A</span><p class="b">one</p></div>
               <div class="r"><span class="a">B</span><p class="b">two</p></div>"#,
        );
        let structured = vec![scraped("C", "three"), scraped("D", "four")];

        let reviews = collect_page_reviews(&doc, &structured, &SELECTORS, 3);
        let bodies: Vec<_> = reviews.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_records_deduplicated_by_content() {
        let game = game();
        let records = review_records(
            &game,
            vec![scraped("A", "same"), scraped("A", "same"), scraped("B", "other")],
            10,
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].app_title, "Foo");
        assert_eq!(records[0].store, Store::Bazaar);
        assert_ne!(records[0].id(), records[1].id());
    }

    #[test]
    fn test_unique_reviews_keep_first_occurrence() {
        let mut edited = scraped("A", "same");
        edited.rating = Some(1.0);

        let unique = unique_reviews(vec![scraped("A", "same"), scraped("B", "x"), edited]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].rating, Some(4.0));
    }

    #[test]
    fn test_records_capped_after_dedupe() {
        let records = review_records(
            &game(),
            vec![scraped("A", "1"), scraped("A", "1"), scraped("B", "2"), scraped("C", "3")],
            2,
        );
        let bodies: Vec<_> = records.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["1", "2"]);
    }
}
