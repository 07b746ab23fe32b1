use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so operators can tell which configuration produced a crawl.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Reads seed URLs from a text file, one per line
///
/// A missing file yields no seeds rather than an error.
pub fn read_seed_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        tracing::warn!("Seed file {} does not exist", path.display());
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_seed_lines(&content))
}

/// Splits seed file content into URLs, skipping blanks and `#` comments
///
/// A leading byte-order mark on any line is stripped.
pub fn parse_seed_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
concurrency = 4
politeness-delay-ms = 1500
max-apps = 1000
same-domain-only = true

[seeds]
urls = ["https://cafebazaar.ir/cat/strategy"]

[discovery]
enabled = true
roots = ["https://myket.ir/games"]
max-lists = 20

[enrichment]
review-cap = 10

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.concurrency, 4);
        assert_eq!(config.crawler.politeness_delay_ms, 1500);
        assert_eq!(config.crawler.max_apps, 1000);
        assert!(config.crawler.same_domain_only);
        assert!(config.crawler.follow_lists);
        assert_eq!(config.seeds.urls.len(), 1);
        assert_eq!(config.discovery.max_lists, 20);
        assert_eq!(config.discovery.max_page, 50);
        assert_eq!(config.enrichment.review_cap, 10);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.output.database_path, "./test.db");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawler.concurrency, 2);
        assert_eq!(config.crawler.politeness_delay_ms, 3000);
        assert!(!config.discovery.enabled);
        assert!(config.enrichment.reviews);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/crawler.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
concurrency = 0
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_parse_seed_lines_skips_comments_and_bom() {
        let content = "\u{feff}https://myket.ir/games/action\n\n# comment\n  https://cafebazaar.ir/cat/puzzle  \n";
        let seeds = parse_seed_lines(content);
        assert_eq!(
            seeds,
            vec![
                "https://myket.ir/games/action".to_string(),
                "https://cafebazaar.ir/cat/puzzle".to_string()
            ]
        );
    }

    #[test]
    fn test_read_missing_seed_file_is_empty() {
        let seeds = read_seed_file(Path::new("/nonexistent/urls.txt")).unwrap();
        assert!(seeds.is_empty());
    }
}
