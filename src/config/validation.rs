use crate::config::types::{
    Config, CrawlerConfig, DiscoveryConfig, EnrichmentConfig, HttpConfig, OutputConfig,
    RetryConfig, SeedConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_retry_config(&config.retry)?;
    validate_seed_config(&config.seeds)?;
    validate_discovery_config(&config.discovery)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.idle_poll_ms == 0 {
        return Err(ConfigError::Validation(
            "idle-poll-ms must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if !(config.multiplier >= 1.0) {
        return Err(ConfigError::Validation(format!(
            "multiplier must be >= 1.0, got {}",
            config.multiplier
        )));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base-delay-ms ({}) cannot exceed max-delay-ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

fn validate_seed_config(config: &SeedConfig) -> Result<(), ConfigError> {
    for seed in &config.urls {
        validate_http_url(seed, "seed")?;
    }
    Ok(())
}

fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.roots.is_empty() {
        return Err(ConfigError::Validation(
            "discovery is enabled but no roots are configured".to_string(),
        ));
    }

    for root in &config.roots {
        validate_http_url(root, "discovery root")?;
    }

    if config.max_lists < 1 {
        return Err(ConfigError::Validation(
            "max-lists must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if config.review_cap > 1000 {
        return Err(ConfigError::Validation(format!(
            "review-cap must be <= 1000, got {}",
            config.review_cap
        )));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a configured URL parses and uses an HTTP(S) scheme
fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} URL '{}': {}", what, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} URL '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}
