//! Shared crawl state
//!
//! These types are the only state workers exchange, and all of it lives in
//! the shared store rather than in process memory.
//!
//! # Components
//!
//! - `FrontierItem`: a queued URL with its inherited genre hint and referring list page
//! - `CrawlCounters`: pages processed and apps indexed, checked against quotas

mod counters;
mod frontier_item;

pub use counters::{CrawlCounters, APPS_INDEXED, PAGES_CRAWLED};
pub use frontier_item::{FrontierItem, FRONTIER_SCHEMA_VERSION};
