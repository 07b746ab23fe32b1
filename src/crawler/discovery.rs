//! Category discovery and frontier bootstrap
//!
//! Before the worker pool starts, each discovery root is walked breadth-first
//! over list pages only. Every category found is expanded speculatively into
//! `?page=2..K` candidates without fetching them; the pool confirms them later.
//! The resulting list URLs, plus static seeds, initialize the frontier when it
//! is empty.

use super::context::CrawlContext;
use super::fetcher::{fetch_page, FetchResult};
use super::parser::extract_links;
use super::retry::RetryPolicy;
use crate::config::{read_seed_file, DiscoveryConfig, SeedConfig};
use crate::state::FrontierItem;
use crate::storage::FrontierStore;
use crate::url::{category_slug, normalize_url};
use crate::Result;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use url::Url;

/// Ordered, bounded, duplicate-free seed list
struct SeedList {
    urls: Vec<String>,
    seen: HashSet<String>,
    limit: usize,
}

impl SeedList {
    fn new(limit: usize) -> Self {
        Self {
            urls: Vec::new(),
            seen: HashSet::new(),
            limit,
        }
    }

    fn push(&mut self, url: String) {
        if self.urls.len() < self.limit && self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.limit
    }

    fn len(&self) -> usize {
        self.urls.len()
    }
}

/// Category URL with its query removed, if `url` is a category page
fn category_base(url: &Url) -> Option<Url> {
    category_slug(url)?;
    let mut base = url.clone();
    base.set_query(None);
    Some(base)
}

/// Expands one root listing URL into at most `max_lists` list URLs
///
/// Fetches at most `max_lists` pages. When nothing at all could be fetched,
/// the root alone is returned.
pub async fn discover_list_urls(
    client: &Client,
    root: &Url,
    config: &DiscoveryConfig,
    policy: &RetryPolicy,
) -> Vec<String> {
    let max_lists = config.max_lists.max(1);
    let mut seeds = SeedList::new(max_lists);
    let mut visited: HashSet<String> = HashSet::new();
    let mut queued: HashSet<String> = HashSet::from([root.to_string()]);
    let mut expanded: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<Url> = VecDeque::from([root.clone()]);
    let mut fetched = 0;

    while let Some(url) = queue.pop_front() {
        if seeds.is_full() || fetched >= max_lists {
            break;
        }
        if !visited.insert(url.to_string()) {
            continue;
        }

        fetched += 1;
        let (final_url, body) = match fetch_page(client, &url, policy).await {
            FetchResult::Success {
                final_url, body, ..
            } => (final_url, body),
            FetchResult::HttpError { status_code, .. } => {
                tracing::warn!("Discovery fetch of {} returned HTTP {}", url, status_code);
                continue;
            }
            FetchResult::NetworkError { error, .. } => {
                tracing::warn!("Discovery fetch of {} failed: {}", url, error);
                continue;
            }
        };

        seeds.push(final_url.to_string());

        let links = extract_links(&body, &final_url, None, true);
        for item in links.lists {
            let link = match Url::parse(&item.url) {
                Ok(link) => link,
                Err(_) => continue,
            };

            if let Some(base) = category_base(&link) {
                if config.max_page >= 2 && expanded.insert(base.to_string()) {
                    seeds.push(base.to_string());
                    for page in 2..=config.max_page {
                        let mut paged = base.clone();
                        paged.query_pairs_mut().append_pair("page", &page.to_string());
                        seeds.push(paged.to_string());
                    }
                }
            }

            if seeds.len() + queue.len() < max_lists * 2
                && !visited.contains(&item.url)
                && queued.insert(item.url.clone())
            {
                queue.push_back(link);
            }
        }
    }

    tracing::info!(
        "Discovery from {} fetched {} pages and produced {} list URLs",
        root,
        fetched,
        seeds.len()
    );

    if seeds.urls.is_empty() {
        tracing::warn!("Discovery from {} found nothing, seeding the root alone", root);
        return vec![root.to_string()];
    }

    seeds.urls
}

/// Static seeds from the configuration and the optional seed file
pub fn static_seeds(seeds: &SeedConfig) -> Result<Vec<String>> {
    let mut urls = seeds.urls.clone();
    if let Some(file) = &seeds.file {
        urls.extend(read_seed_file(Path::new(file))?);
    }
    Ok(urls)
}

/// Seeds the frontier if it is empty
///
/// Runs discovery for each configured root only when the frontier needs
/// seeding, so restarting a crawl resumes its queue instead. Returns how many
/// seeds were pushed.
pub async fn bootstrap_frontier(ctx: &CrawlContext) -> Result<usize> {
    let queued = ctx.with_storage(|s| Ok(s.frontier_len()?))?;
    if queued > 0 {
        tracing::info!("Frontier holds {} URLs, resuming", queued);
        return Ok(0);
    }

    let mut raw = static_seeds(&ctx.config.seeds)?;

    let discovery = &ctx.config.discovery;
    if discovery.enabled {
        for root in &discovery.roots {
            match normalize_url(root) {
                Ok(root) => {
                    raw.extend(discover_list_urls(&ctx.client, &root, discovery, &ctx.retry).await)
                }
                Err(e) => tracing::warn!("Skipping discovery root {}: {}", root, e),
            }
        }
    }

    let mut seen = HashSet::new();
    let seeds: Vec<FrontierItem> = raw
        .iter()
        .filter_map(|raw| match normalize_url(raw) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!("Skipping seed {}: {}", raw, e);
                None
            }
        })
        .filter(|url| seen.insert(url.clone()))
        .map(FrontierItem::seed)
        .collect();

    if seeds.is_empty() {
        tracing::warn!("No seeds configured and nothing discovered");
        return Ok(0);
    }

    let pushed = ctx.with_storage(|s| Ok(s.initialize(&seeds)?))?;
    tracing::info!("Seeded frontier with {} URLs", pushed);
    Ok(pushed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_list_bounded_and_unique() {
        let mut seeds = SeedList::new(2);
        seeds.push("a".to_string());
        seeds.push("a".to_string());
        seeds.push("b".to_string());
        seeds.push("c".to_string());
        assert_eq!(seeds.urls, vec!["a", "b"]);
        assert!(seeds.is_full());
    }

    #[test]
    fn test_category_base_strips_query() {
        let url = Url::parse("https://cafebazaar.ir/cat/action?page=4&l=fa").unwrap();
        assert_eq!(
            category_base(&url).unwrap().as_str(),
            "https://cafebazaar.ir/cat/action"
        );
        assert!(category_base(&Url::parse("https://cafebazaar.ir/pages/game").unwrap()).is_none());
    }
}
