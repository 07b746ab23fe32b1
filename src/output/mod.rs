//! Output module for crawl reports
//!
//! Records themselves live in the document store; this module only turns the
//! store's contents into human-readable statistics.

pub mod stats;

pub use stats::{gather_statistics, print_statistics, CrawlStatistics, StoreTotals};
