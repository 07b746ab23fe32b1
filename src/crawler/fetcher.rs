//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with storefront headers
//! - GET requests with bounded retry on 429, 5xx and transport errors
//! - Error classification into a value the worker loop can log and move past

use super::retry::{is_retryable_status, RetryPolicy};
use crate::config::HttpConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Non-success HTTP status, after retries where applicable
    HttpError {
        /// The HTTP status code of the last attempt
        status_code: u16,
        /// Requests made
        attempts: u32,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Requests made
        attempts: u32,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Builds the HTTP client shared by every worker
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use storefront_crawler::config::HttpConfig;
/// use storefront_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    client_builder(config).build()
}

/// Client builder with the storefront headers applied, for callers that
/// need to adjust it further (for example DNS overrides in tests)
pub fn client_builder(config: &HttpConfig) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
}

/// Fetches a URL, retrying transient failures per `policy`
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Return body |
/// | HTTP 429 | Retry with backoff |
/// | HTTP 5xx | Retry with backoff |
/// | Other HTTP status | Fail immediately |
/// | Transport error (timeout, refused, TLS) | Retry with backoff |
/// | Body read error | Retry with backoff |
///
/// Failures are returned once the policy's attempts are used up.
pub async fn fetch_page(client: &Client, url: &Url, policy: &RetryPolicy) -> FetchResult {
    let mut attempts = 0;

    loop {
        attempts += 1;

        let failure = match client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let final_url = response.url().clone();
                    match response.text().await {
                        Ok(body) => {
                            return FetchResult::Success {
                                final_url,
                                status_code: status.as_u16(),
                                body,
                            }
                        }
                        Err(e) => FetchResult::NetworkError {
                            error: e.to_string(),
                            attempts,
                        },
                    }
                } else if is_retryable_status(status) {
                    FetchResult::HttpError {
                        status_code: status.as_u16(),
                        attempts,
                    }
                } else {
                    return FetchResult::HttpError {
                        status_code: status.as_u16(),
                        attempts,
                    };
                }
            }
            Err(e) => FetchResult::NetworkError {
                error: e.to_string(),
                attempts,
            },
        };

        if !policy.can_retry(attempts) {
            return failure;
        }

        let delay = policy.delay_for(attempts - 1);
        tracing::debug!(
            "Attempt {} for {} failed ({:?}), retrying in {:?}",
            attempts,
            url,
            failure,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(5),
            multiplier: 2.0,
            max_delay: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_fetch_success_sends_headers() {
        let server = MockServer::start().await;
        // Values without commas: the matcher splits header values on them
        Mock::given(method("GET"))
            .and(path("/app/com.foo"))
            .and(header("accept-language", "fa-IR"))
            .and(header("user-agent", "storefront-test/1.0"))
            .and(header_exists("accept"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let client = build_http_client(&HttpConfig {
            user_agent: "storefront-test/1.0".to_string(),
            accept_language: "fa-IR".to_string(),
            ..HttpConfig::default()
        })
        .unwrap();
        let url = Url::parse(&format!("{}/app/com.foo", server.uri())).unwrap();

        match fetch_page(&client, &url, &fast_policy(3)).await {
            FetchResult::Success { body, status_code, .. } => {
                assert_eq!(status_code, 200);
                assert_eq!(body, "<html>ok</html>");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_503_retried_until_budget_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = build_http_client(&HttpConfig::default()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();

        match fetch_page(&client, &url, &fast_policy(3)).await {
            FetchResult::HttpError { status_code, attempts } => {
                assert_eq!(status_code, 503);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_404_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_http_client(&HttpConfig::default()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();

        let result = fetch_page(&client, &url, &fast_policy(3)).await;
        assert!(matches!(
            result,
            FetchResult::HttpError {
                status_code: 404,
                attempts: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
            .mount(&server)
            .await;

        let client = build_http_client(&HttpConfig::default()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();

        assert!(fetch_page(&client, &url, &fast_policy(3)).await.is_success());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let client = build_http_client(&HttpConfig {
            timeout_secs: 2,
            ..HttpConfig::default()
        })
        .unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();

        let result = fetch_page(&client, &url, &fast_policy(2)).await;
        assert!(matches!(result, FetchResult::NetworkError { attempts: 2, .. }));
    }
}
