//! HTTP client wrapper shared by page fetches and metadata requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;

/// User-Agent sent with every request.
#[must_use]
pub fn default_user_agent() -> String {
    format!("mdownloader/{}", env!("CARGO_PKG_VERSION"))
}

/// Source of page bytes.
///
/// [`HttpClient`] is the production implementation; tests substitute
/// scripted fetchers to drive the retry state machine.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the body of `url`. Anything but HTTP 200 is an error.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// HTTP client with connection pooling, gzip and fixed timeouts.
///
/// Created once per run and shared by reference.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Sends a GET request and returns the response whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] for malformed URLs, and
    /// [`DownloadError::Network`] / [`DownloadError::Timeout`] when the
    /// request cannot be completed.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        debug!(status = response.status().as_u16(), "response received");
        Ok(response)
    }

    /// Fetches `url` into memory, requiring HTTP 200.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::HttpStatus`] for any other status, plus the
    /// errors of [`get`](Self::get).
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.get(url).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        debug!(bytes = bytes.len(), "page body received");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        self.get_bytes(url).await
    }
}
