//! Genre backfill for stored games
//!
//! Games indexed with the unknown genre still remember the list page that
//! led to them. When that page is a category listing, its slug names the
//! genre the crawl should have inherited.

use super::genre::genre_hint_for;
use crate::storage::{DocumentStore, StorageResult};
use url::Url;

/// Outcome of one backfill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Unknown-genre games that had a referring list URL
    pub examined: usize,
    pub updated: usize,
}

/// Re-derives the genre of unknown-genre games from their source list URL
///
/// Only games still marked unknown are touched, so a concurrent crawl that
/// resolves a genre first always wins.
pub fn backfill_genres<S: DocumentStore>(storage: &mut S) -> StorageResult<BackfillReport> {
    let candidates = storage.games_missing_genre()?;
    let mut report = BackfillReport {
        examined: candidates.len(),
        updated: 0,
    };

    for (id, list_url) in candidates {
        let genre = match Url::parse(&list_url).ok().and_then(|url| genre_hint_for(&url)) {
            Some(genre) => genre,
            None => continue,
        };

        if storage.set_missing_genre(&id, &genre)? {
            tracing::debug!("Backfilled {} with genre {}", id, genre);
            report.updated += 1;
        }
    }

    tracing::info!(
        "Genre backfill updated {} of {} unknown-genre games",
        report.updated,
        report.examined
    );
    Ok(report)
}
