//! Network transport for JSON APIs
//!
//! Provides the [`Transport`] seam used by the feed manager and the
//! reqwest-backed [`VimeoClient`] with rate limiting and retry logic.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{FeedError, Result, TransportError};
use crate::request::ApiRequest;

/// Executes one request and returns the parsed JSON body
pub trait Transport: Send + Sync + 'static {
    fn fetch_json(&self, request: &ApiRequest) -> impl Future<Output = Result<Value>> + Send;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum requests per second (default: 4.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient errors (default: 3)
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 4.0,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Rate limiter to control request frequency
///
/// Ensures requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// A non-positive rate disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until the next request is allowed
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

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

const USER_AGENT: &str = concat!("continuum/", env!("CARGO_PKG_VERSION"));

/// HTTP transport for the Vimeo API
///
/// Handles all HTTP communication, including:
/// - Rate limiting to stay under the provider's request quota
/// - Automatic retries with exponential backoff for transient errors
/// - Status classification into [`TransportError`]
pub struct VimeoClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
}

impl VimeoClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
        })
    }

    async fn fetch_with_retry(&self, request: &ApiRequest) -> Result<Value> {
        let mut attempt = 0;

        loop {
            self.rate_limiter.acquire().await;

            match self.do_fetch(request).await {
                Ok(body) => return Ok(body),
                Err(FeedError::FetchFailed(e)) if e.is_transient() && attempt < self.max_retries => {
                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(1 << attempt);
                    warn!(url = %request.url(), error = %e, ?backoff, "retrying request");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Perform a single request attempt
    async fn do_fetch(&self, request: &ApiRequest) -> Result<Value> {
        let url = request.url();
        debug!(%url, "sending request");

        let response = request
            .to_reqwest(&self.client)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited.into());
        }

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            }
            .into());
        }

        let body = response.bytes().await.map_err(TransportError::from)?;
        serde_json::from_slice(&body)
            .map_err(|e| FeedError::MalformedResponse(format!("invalid JSON from {}: {}", url, e)))
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

impl Transport for VimeoClient {
    async fn fetch_json(&self, request: &ApiRequest) -> Result<Value> {
        self.fetch_with_retry(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(2.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(0.0);
        assert_eq!(limiter.min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.requests_per_second, 4.0);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_client_creation() {
        let client = VimeoClient::new();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(1.0);

        let start = Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_rate_limiter_acquire() {
        let limiter = RateLimiter::new(10.0); // 100ms interval

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        let elapsed = start.elapsed();

        // Second acquire should wait at least 100ms
        assert!(elapsed >= Duration::from_millis(90)); // Allow small tolerance
    }
}
