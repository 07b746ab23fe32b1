//! Crawler module for storefront page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retry
//! - Link extraction into detail and list frontier items
//! - Category discovery and frontier bootstrap
//! - The worker pool that drives everything against the shared store

mod context;
mod coordinator;
mod discovery;
mod fetcher;
mod parser;
mod retry;

pub use context::CrawlContext;
pub use coordinator::{
    process_item, run_crawl, run_crawl_with_context, run_worker, run_workers, CrawlSummary,
    PageOutcome, WorkerReport,
};
pub use discovery::{bootstrap_frontier, discover_list_urls, static_seeds};
pub use fetcher::{build_http_client, client_builder, fetch_page, FetchResult};
pub use parser::{extract_links, PageLinks};
pub use retry::{is_retryable_status, RetryPolicy};
