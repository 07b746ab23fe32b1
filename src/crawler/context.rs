//! Dependencies shared by every worker

use super::fetcher::build_http_client;
use super::retry::RetryPolicy;
use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::{CrawlError, Result};
use reqwest::Client;
use std::sync::{Arc, Mutex};

/// HTTP client, store and adapters, built once and handed to every worker
#[derive(Clone)]
pub struct CrawlContext {
    pub config: Arc<Config>,
    pub client: Client,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub registry: Arc<AdapterRegistry>,
    pub retry: RetryPolicy,
}

impl CrawlContext {
    /// Builds a context with a client made from the HTTP configuration
    pub fn new(config: Config, storage: SqliteStorage) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        Ok(Self::with_client(config, storage, client))
    }

    /// Builds a context around an existing client
    pub fn with_client(config: Config, storage: SqliteStorage, client: Client) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self {
            config: Arc::new(config),
            client,
            storage: Arc::new(Mutex::new(storage)),
            registry: Arc::new(AdapterRegistry::with_default_adapters()),
            retry,
        }
    }

    /// Replaces the adapter registry
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Runs `f` with exclusive access to the store
    ///
    /// The lock is released before this returns, so callers never hold it
    /// across an await point.
    pub fn with_storage<T>(&self, f: impl FnOnce(&mut SqliteStorage) -> Result<T>) -> Result<T> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| CrawlError::LockPoisoned(e.to_string()))?;
        f(&mut storage)
    }
}
