//! HTTP client for catalog crawling
//!
//! One GET per call, no retries: the crawl treats a failed fetch as a skipped
//! page. Pages are returned as `String` so callers can hold them across
//! `.await` points and parse them synchronously afterwards.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::infrastructure::config::HttpConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("HTTP request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP error {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("Empty response from {url}")]
    EmptyBody { url: String },
}

/// Source of raw page bodies
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// Whether to follow redirects
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    pub fn from_http_config(http: &HttpConfig) -> Self {
        Self {
            timeout_seconds: http.request_timeout_seconds,
            user_agent: http.user_agent.clone(),
            accept_language: http.accept_language.clone(),
            follow_redirects: http.follow_redirects,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_http_config(&HttpConfig::default())
    }
}

/// reqwest-backed [`PageFetcher`]
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        let language = HeaderValue::from_str(&config.accept_language)
            .map_err(|e| FetchError::ClientBuild(format!("invalid Accept-Language: {e}")))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("🌐 HTTP GET: {}", url);
        let response = self.client.get(url).send().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ HTTP error {}: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        if body.is_empty() {
            return Err(FetchError::EmptyBody { url: url.to_string() });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn test_custom_config() {
        let config = HttpClientConfig {
            timeout_seconds: 10,
            user_agent: "Test Agent".to_string(),
            accept_language: "ru-RU,ru;q=0.9".to_string(),
            follow_redirects: false,
        };

        let client = HttpClient::with_config(config).unwrap();
        assert_eq!(client.config().timeout_seconds, 10);
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let config = HttpClientConfig {
            accept_language: "ru\nRU".to_string(),
            ..Default::default()
        };
        assert!(matches!(HttpClient::with_config(config), Err(FetchError::ClientBuild(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let config = HttpClientConfig {
            timeout_seconds: 2,
            ..Default::default()
        };
        let client = HttpClient::with_config(config).unwrap();
        let result = client.fetch("http://127.0.0.1:9/catalog/").await;
        assert!(matches!(result, Err(FetchError::Network { .. })));
    }
}
