//! HTTP fetcher with rate limiting and retry
//!
//! Shared by all source adapters. Provides User-Agent rotation, request
//! rate limiting with governor, and bounded retry with exponential backoff
//! on transient server errors.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT},
    Client,
};
use std::num::NonZeroU32;
use std::time::Duration;

use super::FetchError;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// HTTP fetcher for gift-code listing pages
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl HttpFetcher {
    /// Create a new fetcher with default retry settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 3, Duration::from_secs(30))
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::per_second(rate);
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            max_retries,
            base_delay_ms: 1000,
            base_url: None,
        })
    }

    /// Create a new fetcher with a custom base URL for testing
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_base_url(base_url: &str, requests_per_second: u32) -> Result<Self, FetchError> {
        let mut fetcher = Self::new(requests_per_second)?;
        fetcher.base_url = Some(base_url.to_string());
        Ok(fetcher)
    }

    /// Fetch a page with rate limiting and retry
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MaxRetriesExceeded` if all retries fail, or the
    /// terminal error for non-retryable status codes
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        self.fetch_with_retry(url).await
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            // Exponential backoff between retries
            if attempt > 0 {
                let delay = self.base_delay_ms * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let headers = self.build_headers();

            let full_url = if let Some(base) = &self.base_url {
                format!("{base}{url}")
            } else {
                url.to_string()
            };

            match self.client.get(&full_url).headers(headers).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.text().await.map_err(FetchError::Http);
                    } else if Self::should_retry(status.as_u16()) {
                        last_error = Some(FetchError::ServerError(status.as_u16()));
                        continue;
                    } else {
                        return Err(FetchError::ServerError(status.as_u16()));
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(FetchError::Timeout);
                    } else {
                        last_error = Some(FetchError::Http(e));
                    }
                }
            }
        }

        if let Some(e) = last_error {
            tracing::warn!(url, error = %e, "all fetch retries exhausted");
        }
        Err(FetchError::MaxRetriesExceeded)
    }

    /// Determine if a status code should trigger a retry
    ///
    /// Retry on 429 and transient 5xx responses; anything else is terminal.
    fn should_retry(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let user_agent = self.random_user_agent();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate, br"),
        );

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}
