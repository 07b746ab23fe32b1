//! Configuration module for the storefront crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and reading the optional seed file.
//!
//! # Example
//!
//! ```no_run
//! use storefront_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Workers: {}", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DiscoveryConfig, EnrichmentConfig, HttpConfig, OutputConfig,
    RetryConfig, SeedConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_seed_lines, read_seed_file,
};
