//! HTTP fetcher implementation
//!
//! The crawl engine only needs "give me the body of this URL within this
//! timeout". `PageFetcher` is that seam; `HttpFetcher` is the reqwest-backed
//! implementation used by the server, tests plug in scripted fetchers.

use crate::config::UserAgentConfig;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a page body could not be obtained
///
/// The orchestrator treats every variant the same way; the distinction only
/// matters for logging.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Fetch failed for {url}: {message}")]
    Other { url: String, message: String },
}

/// Source of page bodies for the crawl engine
pub trait PageFetcher: Send + Sync + 'static {
    /// Returns the full body of `url` on HTTP 200, or an error for any other
    /// status, a timeout, or a transport failure
    fn fetch(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use sitegrep::config::UserAgentConfig;
/// use sitegrep::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed page fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        let request = self.client.get(url.clone()).timeout(timeout);
        let url = url.to_string();

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| classify_error(&url, e))?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|e| classify_error(&url, e))
        }
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
