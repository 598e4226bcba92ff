//! Error types for the anime catalog crawler
//!
//! Fetch errors are recoverable: the paginator stops early and the detail
//! resolver skips the item. Configuration and sink errors are fatal.

use thiserror::Error;

/// Error type for crawler operations
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Status { url: String, status: u16 },

    /// Server kept answering 429 after all retries
    #[error("Rate limited while fetching {url}")]
    RateLimited { url: String },

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid source profile or crawl configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Record sink could not write to disk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// Whether this error came from fetching a page.
    ///
    /// Fetch errors are recovered locally by the crawler; everything else
    /// is surfaced to the caller.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            CrawlError::Fetch { .. } | CrawlError::Status { .. } | CrawlError::RateLimited { .. }
        )
    }

    /// URL of the page that failed, for fetch errors.
    pub fn url(&self) -> Option<&str> {
        match self {
            CrawlError::Fetch { url, .. }
            | CrawlError::Status { url, .. }
            | CrawlError::RateLimited { url } => Some(url),
            _ => None,
        }
    }
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let error = CrawlError::Status {
            url: "https://animevost.org/page/3/".to_string(),
            status: 503,
        };
        assert_eq!(
            error.to_string(),
            "HTTP 503 while fetching https://animevost.org/page/3/"
        );
    }

    #[test]
    fn test_rate_limited_display() {
        let error = CrawlError::RateLimited {
            url: "https://anidub.biz/".to_string(),
        };
        assert_eq!(error.to_string(), "Rate limited while fetching https://anidub.biz/");
    }

    #[test]
    fn test_parse_error_display() {
        let error = CrawlError::ParseError("bad selector".to_string());
        assert_eq!(error.to_string(), "Failed to parse HTML: bad selector");
    }

    #[test]
    fn test_config_error_display() {
        let error = CrawlError::Config("empty base url".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: empty base url");
    }

    #[test]
    fn test_is_fetch_error() {
        let status = CrawlError::Status {
            url: "https://a.test/".to_string(),
            status: 404,
        };
        assert!(status.is_fetch_error());
        assert_eq!(status.url(), Some("https://a.test/"));

        let limited = CrawlError::RateLimited {
            url: "https://a.test/x".to_string(),
        };
        assert!(limited.is_fetch_error());

        let parse = CrawlError::ParseError("x".to_string());
        assert!(!parse.is_fetch_error());
        assert_eq!(parse.url(), None);
    }

    #[test]
    fn test_io_error_is_fatal() {
        let error: CrawlError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(!error.is_fetch_error());
        assert!(error.to_string().contains("disk full"));
    }
}
