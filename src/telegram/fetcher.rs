//! HTTP fetcher for channel preview pages
//!
//! Wraps reqwest with rate limiting (governor) and exponential-backoff
//! retries, mirroring the timeout and politeness settings from the
//! `[telegram]` config section.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;

use crate::config::TelegramSettings;
use crate::engine::ports::ChannelFetcher;
use crate::models::ChannelPost;
use crate::telegram::normalize_handle;
use crate::telegram::parse::{parse_channel_page, MessageSelectors};
use crate::utils::error::FetchError;

/// Channel preview fetcher with rate limiting and retry
pub struct TelegramFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Compiled message selectors
    selectors: MessageSelectors,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,

    /// Preview host, overridable for tests with a mock server
    base_url: String,
}

impl TelegramFetcher {
    /// Create a new fetcher from the telegram config section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(settings: &TelegramSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(settings.rate_limit.max(1.0) as u32)
            .unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::per_second(rate);
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            selectors: MessageSelectors::new(),
            max_retries: settings.max_retries,
            base_delay_ms: 1000,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a fetcher pointed at a custom base URL (for mock servers)
    pub fn with_base_url(base_url: &str, settings: &TelegramSettings) -> Result<Self, FetchError> {
        let mut settings = settings.clone();
        settings.base_url = base_url.to_string();
        Self::new(&settings)
    }

    /// Fetch up to `limit` recent posts for a channel, newest first
    pub async fn fetch_posts(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<ChannelPost>, FetchError> {
        let handle = normalize_handle(channel)?;

        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let html = self.fetch_with_retry(handle).await?;
        parse_channel_page(&self.selectors, &html, handle, limit)
    }

    /// Fetch the preview page with exponential backoff retry logic
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MaxRetriesExceeded` if all retries fail
    async fn fetch_with_retry(&self, handle: &str) -> Result<String, FetchError> {
        let url = format!("{}/s/{}", self.base_url, handle);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            // Apply exponential backoff for retries
            if attempt > 0 {
                let delay = self.base_delay_ms * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.fetch_once(&url, handle).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    tracing::warn!(
                        channel = %handle,
                        attempt = attempt,
                        error = %e,
                        "Preview fetch failed"
                    );
                    // Rate limiting and server errors are retryable; the
                    // rest are not worth hammering.
                    let retryable = matches!(
                        e,
                        FetchError::RateLimit
                            | FetchError::ServerError(_)
                            | FetchError::Timeout
                            | FetchError::Http(_)
                    );
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::MaxRetriesExceeded))
    }

    /// Single fetch attempt
    async fn fetch_once(&self, url: &str, handle: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimit);
        }
        if status.as_u16() == 404 {
            // Unknown or private channel, not worth retrying
            return Err(FetchError::InvalidChannel(handle.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let body = response.text().await.map_err(FetchError::Http)?;
        Ok(body)
    }
}

#[async_trait]
impl ChannelFetcher for TelegramFetcher {
    async fn fetch_recent(
        &self,
        channel: &str,
        limit: usize,
    ) -> crate::error::Result<Vec<ChannelPost>> {
        self.fetch_posts(channel, limit).await.map_err(Into::into)
    }
}
