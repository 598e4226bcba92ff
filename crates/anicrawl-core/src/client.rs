//! HTTP client with rate limiting for the catalog sites
//!
//! Every request goes through a [`RateLimiter`] so that consecutive fetches
//! against one source are spaced out. Transient errors (429, 5xx) are retried
//! with exponential backoff; everything else is reported to the caller as a
//! fetch error.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{CrawlError, Result};

/// Default User-Agent mimicking a modern browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default Accept-Language header for Russian content
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en;q=0.8";

/// Suspend the current task for `duration`.
///
/// A zero duration returns immediately, which lets tests run crawls
/// without real delays.
pub async fn wait(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart
/// to avoid overwhelming the source server.
pub struct RateLimiter {
    /// Minimum interval between requests
    min_interval: Duration,
    /// Timestamp of the last request, `None` before the first one
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given minimum spacing
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use anicrawl_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(Duration::from_millis(500));
    /// ```
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Acquire permission to make a request
    ///
    /// Waits if necessary so that the minimum interval since the previous
    /// acquisition is respected.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Accept-Language sent with every request
    pub accept_language: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Minimum spacing between two requests in milliseconds (default: 500)
    pub min_request_interval_ms: u64,
    /// Retries for 429 and 5xx responses (default: 3)
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds (default: 1000)
    pub retry_base_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout_secs: 30,
            min_request_interval_ms: 500,
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

/// HTTP client with rate limiting and retry logic
///
/// This client automatically:
/// - Limits request rate to avoid server overload
/// - Retries on transient errors (429, 5xx) with exponential backoff
/// - Sends a browser User-Agent and Russian Accept-Language
pub struct CrawlClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Rate limiter for request throttling
    rate_limiter: RateLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl CrawlClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// Returns `CrawlError::Config` if a header value is invalid or the
    /// HTTP client cannot be built
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(&config.accept_language)
            .map_err(|e| CrawlError::Config(format!("accept_language: {}", e)))?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CrawlError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(Duration::from_millis(config.min_request_interval_ms)),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    /// Fetch the document at an absolute URL
    ///
    /// # Errors
    /// - `CrawlError::Fetch` - transport failure (timeout, DNS, connection)
    /// - `CrawlError::RateLimited` - server returned 429 after all retries
    /// - `CrawlError::Status` - any other non-success status
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;

        loop {
            self.rate_limiter.acquire().await;
            debug!(url, attempt, "GET");

            let response = self.client.get(url).send().await.map_err(|source| {
                CrawlError::Fetch {
                    url: url.to_string(),
                    source,
                }
            })?;
            let status = response.status();

            if status.is_success() {
                return response.text().await.map_err(|source| CrawlError::Fetch {
                    url: url.to_string(),
                    source,
                });
            }

            let transient = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status.is_server_error();

            if transient && attempt < self.max_retries {
                let delay = self.backoff_delay(attempt);
                warn!(url, status = status.as_u16(), ?delay, "Transient HTTP error, retrying");
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(CrawlError::RateLimited {
                    url: url.to_string(),
                });
            }

            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
    }

    /// Exponential backoff delay: base, 2 * base, 4 * base, ...
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Get a reference to the rate limiter (for testing)
    #[cfg(test)]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
