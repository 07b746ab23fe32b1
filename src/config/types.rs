use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the storefront crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub seeds: SeedConfig,
    pub discovery: DiscoveryConfig,
    pub enrichment: EnrichmentConfig,
    pub output: OutputConfig,
}

/// Worker pool behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    pub concurrency: u32,

    /// Delay each worker sleeps after every page, whatever the outcome (milliseconds)
    pub politeness_delay_ms: u64,

    /// How long a worker waits before polling an empty frontier again (milliseconds)
    pub idle_poll_ms: u64,

    /// Consecutive empty polls after which a worker exits (0 = wait forever)
    pub max_idle_polls: u32,

    /// Stop once this many pages have been processed (0 = unlimited)
    pub max_pages: u64,

    /// Stop once this many apps have been indexed (0 = unlimited)
    pub max_apps: u64,

    /// Only follow links on the same host as the page they were found on
    pub same_domain_only: bool,

    /// Enqueue list links found on list pages
    pub follow_lists: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            politeness_delay_ms: 3000,
            idle_poll_ms: 1000,
            max_idle_polls: 30,
            max_pages: 0,
            max_apps: 0,
            same_domain_only: false,
            follow_lists: true,
        }
    }
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// HTTP client identity and limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Linux; Android 12; Pixel 5) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36"
                .to_string(),
            accept_language: "fa-IR,fa;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

/// Bounded exponential backoff shared by the fetch and discovery paths
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts including the first request
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 8000,
        }
    }
}

/// Static seed sources
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SeedConfig {
    /// Seed URLs listed inline
    pub urls: Vec<String>,

    /// Optional file with one seed URL per line (`#` starts a comment)
    pub file: Option<String>,
}

/// Category-root discovery run before the worker pool starts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    pub enabled: bool,

    /// Root listing URLs to expand into list seeds
    pub roots: Vec<String>,

    /// Maximum number of list URLs produced (and fetched) per root
    pub max_lists: usize,

    /// Highest page number generated for each discovered category
    pub max_page: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            roots: vec![
                "https://myket.ir/games".to_string(),
                "https://cafebazaar.ir/pages/game".to_string(),
            ],
            max_lists: 200,
            max_page: 50,
        }
    }
}

/// Secondary enrichment stages of the extraction pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnrichmentConfig {
    pub reviews: bool,
    pub review_cap: usize,

    /// Allow adapters to make extra requests to top up reviews
    pub supplemental_reviews: bool,

    pub assets: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            reviews: true,
            review_cap: 50,
            supplemental_reviews: false,
            assets: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database shared by every worker and process
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./storefront.db".to_string(),
        }
    }
}
