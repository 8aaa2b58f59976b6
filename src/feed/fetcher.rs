use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Response bodies above this size are rejected rather than buffered.
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a feed document.
///
/// Every variant is transient from the scheduler's point of view: the
/// cycle fails, the failure counter is bumped, and the feed is retried on
/// the next cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, reset).
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request (connection or full-body read) exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit.
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Retrieves raw feed documents over HTTP(S).
///
/// The timeout bounds the whole operation: a slow server can never block
/// a feed task past it, whether it stalls on connect or mid-body.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Build a fetcher around an existing client (custom configuration,
    /// shared connection pool).
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch the raw text of a feed document.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_limited(url, MAX_FEED_SIZE).await
    }

    async fn fetch_limited(&self, url: &str, limit: usize) -> Result<String, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, limit))
            .await
            .map_err(|_| FetchError::Timeout)??;

        // Snapshots are stored as TEXT; tolerate stray bytes the way a
        // best-effort reader should.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
