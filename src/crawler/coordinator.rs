//! Crawl coordinator: the fetch worker pool
//!
//! Every worker runs the same loop against the shared store:
//!
//! 1. stop if the page or app quota is reached
//! 2. pop a frontier item (idle-wait when the frontier is empty)
//! 3. fetch it with bounded retry
//! 4. detail page: run the extraction pipeline; list page: enqueue its links
//! 5. bump the shared counters and sleep the politeness delay
//!
//! Workers keep no state of their own beyond a tally for the final report;
//! the store is the source of truth, so several processes can run pools
//! against one database.

use super::context::CrawlContext;
use super::discovery::bootstrap_frontier;
use super::fetcher::{fetch_page, FetchResult};
use super::parser::extract_links;
use crate::config::Config;
use crate::extract::{index_detail_page, DetailOutcome};
use crate::state::{FrontierItem, APPS_INDEXED, PAGES_CRAWLED};
use crate::storage::{open_storage, CounterStore, FrontierStore};
use crate::url::{classify_url, UrlKind};
use crate::{CrawlError, Result};
use std::path::Path;
use tokio::task::JoinSet;
use url::Url;

/// What a worker did with one frontier item
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Detail page written to the store
    Indexed,
    /// Detail page fetched but deliberately not written
    Skipped,
    /// List page harvested; counts are newly enqueued URLs
    Harvested { details: usize, lists: usize },
    /// Fetch or pipeline failure, already logged
    Failed,
    /// Not a storefront detail or list URL; never fetched
    Ignored,
}

impl PageOutcome {
    /// True when a request was sent for the item
    pub fn fetched(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Tally of one worker's pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub pages: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub enqueued: u64,
}

impl WorkerReport {
    fn record(&mut self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Indexed => self.indexed += 1,
            PageOutcome::Skipped => self.skipped += 1,
            PageOutcome::Harvested { details, lists } => {
                self.enqueued += (*details + *lists) as u64
            }
            PageOutcome::Failed => self.failed += 1,
            PageOutcome::Ignored => return,
        }
        self.pages += 1;
    }
}

/// Totals for a finished crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Seeds pushed by the bootstrap (0 when resuming)
    pub seeded: usize,
    pub workers: usize,
    pub pages: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub enqueued: u64,
}

impl CrawlSummary {
    fn absorb(&mut self, report: WorkerReport) {
        self.workers += 1;
        self.pages += report.pages;
        self.indexed += report.indexed;
        self.skipped += report.skipped;
        self.failed += report.failed;
        self.enqueued += report.enqueued;
    }
}

/// Enqueues a list page's links: details at the head, lists at the tail
fn harvest_links(
    ctx: &CrawlContext,
    page_url: &Url,
    body: &str,
    item: &FrontierItem,
) -> Result<PageOutcome> {
    let crawler = &ctx.config.crawler;
    let links = extract_links(
        body,
        page_url,
        item.genre_hint.as_deref(),
        crawler.same_domain_only,
    );

    ctx.with_storage(|s| {
        let mut details = 0;
        // Head insertion reverses order, so push the last link first
        for detail in links.details.iter().rev() {
            if s.enqueue(detail, true)? {
                details += 1;
            }
        }

        let mut lists = 0;
        if crawler.follow_lists {
            for list in &links.lists {
                if s.enqueue(list, false)? {
                    lists += 1;
                }
            }
        }

        Ok(PageOutcome::Harvested { details, lists })
    })
}

/// Fetches and routes one frontier item
pub async fn process_item(ctx: &CrawlContext, item: &FrontierItem) -> PageOutcome {
    let url = match Url::parse(&item.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Dropping unparseable frontier URL {}: {}", item.url, e);
            return PageOutcome::Ignored;
        }
    };

    let kind = classify_url(&url);
    if kind == UrlKind::Irrelevant {
        tracing::debug!("Ignoring irrelevant URL {}", url);
        return PageOutcome::Ignored;
    }

    let (final_url, body) = match fetch_page(&ctx.client, &url, &ctx.retry).await {
        FetchResult::Success {
            final_url, body, ..
        } => (final_url, body),
        FetchResult::HttpError {
            status_code,
            attempts,
        } => {
            tracing::warn!(
                "Giving up on {} after {} attempt(s): HTTP {}",
                url,
                attempts,
                status_code
            );
            return PageOutcome::Failed;
        }
        FetchResult::NetworkError { error, attempts } => {
            tracing::warn!(
                "Giving up on {} after {} attempt(s): {}",
                url,
                attempts,
                error
            );
            return PageOutcome::Failed;
        }
    };

    match kind {
        UrlKind::Detail => match index_detail_page(ctx, &url, &body, item).await {
            Ok(DetailOutcome::Indexed {
                game_id,
                genre,
                reviews,
                assets,
            }) => {
                tracing::info!(
                    "Indexed {} [{}] with {} reviews, {} assets",
                    game_id,
                    genre,
                    reviews,
                    assets
                );
                PageOutcome::Indexed
            }
            Ok(DetailOutcome::Skipped { reason }) => {
                tracing::info!("Skipped {}: {}", url, reason);
                PageOutcome::Skipped
            }
            Err(e) => {
                tracing::warn!("Failed to index {}: {}", url, e);
                PageOutcome::Failed
            }
        },
        UrlKind::List => match harvest_links(ctx, &final_url, &body, item) {
            Ok(outcome) => {
                if let PageOutcome::Harvested { details, lists } = &outcome {
                    tracing::debug!(
                        "List {} yielded {} new detail and {} new list URLs",
                        url,
                        details,
                        lists
                    );
                }
                outcome
            }
            Err(e) => {
                tracing::warn!("Failed to enqueue links from {}: {}", url, e);
                PageOutcome::Failed
            }
        },
        UrlKind::Irrelevant => PageOutcome::Ignored,
    }
}

fn is_fatal(error: &CrawlError) -> bool {
    matches!(error, CrawlError::LockPoisoned(_))
}

/// One worker's loop; returns when a quota is hit or the frontier stays empty
pub async fn run_worker(id: usize, ctx: CrawlContext) -> Result<WorkerReport> {
    let crawler = &ctx.config.crawler;
    let mut report = WorkerReport::default();
    let mut idle_polls = 0u32;

    loop {
        match ctx.with_storage(|s| Ok(s.load_counters()?)) {
            Ok(counters) if counters.quota_reached(crawler) => {
                tracing::info!(
                    "Worker {} stopping: quota reached ({} pages, {} apps)",
                    id,
                    counters.pages_crawled,
                    counters.apps_indexed
                );
                break;
            }
            Ok(_) => {}
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => tracing::warn!("Worker {} could not read counters: {}", id, e),
        }

        let next = match ctx.with_storage(|s| Ok(s.dequeue()?)) {
            Ok(next) => next,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                tracing::warn!("Worker {} could not pop the frontier: {}", id, e);
                None
            }
        };

        let item = match next {
            Some(item) => {
                idle_polls = 0;
                item
            }
            None => {
                idle_polls += 1;
                if crawler.max_idle_polls > 0 && idle_polls >= crawler.max_idle_polls {
                    tracing::info!("Worker {} stopping: frontier stayed empty", id);
                    break;
                }
                tokio::time::sleep(crawler.idle_poll()).await;
                continue;
            }
        };

        tracing::debug!("Worker {} processing {}", id, item.url);
        let outcome = process_item(&ctx, &item).await;
        report.record(&outcome);

        if !outcome.fetched() {
            continue;
        }

        let counted = ctx.with_storage(|s| {
            s.increment_counter(PAGES_CRAWLED, 1)?;
            if outcome == PageOutcome::Indexed {
                s.increment_counter(APPS_INDEXED, 1)?;
            }
            Ok(())
        });
        match counted {
            Ok(()) => {}
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => tracing::warn!("Worker {} could not update counters: {}", id, e),
        }

        tokio::time::sleep(crawler.politeness_delay()).await;
    }

    Ok(report)
}

/// Runs the configured number of workers until all of them stop
pub async fn run_workers(ctx: &CrawlContext) -> Result<CrawlSummary> {
    let concurrency = ctx.config.crawler.concurrency.max(1) as usize;
    tracing::info!("Starting {} workers", concurrency);

    let mut workers = JoinSet::new();
    for id in 0..concurrency {
        let ctx = ctx.clone();
        workers.spawn(run_worker(id, ctx));
    }

    let mut summary = CrawlSummary::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(report)) => summary.absorb(report),
            Ok(Err(e)) => tracing::error!("Worker stopped with error: {}", e),
            Err(e) => tracing::error!("Worker task failed: {}", e),
        }
    }

    Ok(summary)
}

/// Bootstraps the frontier and runs the worker pool on an existing context
pub async fn run_crawl_with_context(ctx: CrawlContext) -> Result<CrawlSummary> {
    let seeded = bootstrap_frontier(&ctx).await?;
    let mut summary = run_workers(&ctx).await?;
    summary.seeded = seeded;

    tracing::info!(
        "Crawl finished: {} pages, {} indexed, {} skipped, {} failed",
        summary.pages,
        summary.indexed,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

/// Opens the configured store and runs a complete crawl
pub async fn run_crawl(config: Config) -> Result<CrawlSummary> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let ctx = CrawlContext::new(config, storage)?;
    run_crawl_with_context(ctx).await
}
