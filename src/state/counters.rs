use crate::config::CrawlerConfig;

/// Counter key for pages processed by any worker
pub const PAGES_CRAWLED: &str = "pages_crawled";

/// Counter key for detail pages that produced a game record
pub const APPS_INDEXED: &str = "apps_indexed";

/// Snapshot of the shared crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCounters {
    pub pages_crawled: u64,
    pub apps_indexed: u64,
}

impl CrawlCounters {
    /// Returns true once either quota is reached (0 disables a quota)
    pub fn quota_reached(&self, config: &CrawlerConfig) -> bool {
        (config.max_pages > 0 && self.pages_crawled >= config.max_pages)
            || (config.max_apps > 0 && self.apps_indexed >= config.max_apps)
    }
}
