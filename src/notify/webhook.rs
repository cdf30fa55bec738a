//! HTTP bridge adapter for the notification contracts
//!
//! Talks to the out-of-process bot glue over a small JSON API:
//!
//! - `POST   {base}/channels/{channel}/announcements` - post, returns `{"id"}`
//! - `DELETE {base}/announcements/{id}` - retract
//! - `GET    {base}/channels/{channel}/announcements?limit=N` - list recent
//!
//! Transient failures (429, 5xx) are retried a bounded number of times with
//! exponential backoff; anything else surfaces as a [`SinkError`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{
    Announcement, AnnouncementSource, NotificationSink, PostedAnnouncement, SinkError,
};
use crate::models::{AnnouncementRef, ChannelRef};

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

/// Bridge endpoint configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the bridge API
    pub url: String,

    /// Optional bearer token
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retry attempts on transient failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl BridgeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("bridge URL cannot be empty".to_string());
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("bridge URL must start with http:// or https://".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct AnnounceResponse {
    id: String,
}

#[derive(Deserialize)]
struct ListedAnnouncement {
    id: String,
    title: String,
}

/// Notification sink and announcement source over the HTTP bridge
pub struct BridgeSink {
    config: BridgeConfig,
    client: Client,
}

impl BridgeSink {
    pub fn new(config: BridgeConfig) -> Result<Self, SinkError> {
        config.validate().map_err(SinkError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Create a bridge sink with just a URL
    pub fn from_url(url: impl Into<String>) -> Result<Self, SinkError> {
        Self::new(BridgeConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.config.url));
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send with bounded retry on transient status codes
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SinkError> {
        let mut last_status = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = 500 * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let response = build().send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504) {
                last_status = Some(status.as_u16());
                continue;
            }

            return Err(SinkError::Status(status.as_u16()));
        }

        Err(SinkError::Status(last_status.unwrap_or(0)))
    }
}

#[async_trait]
impl NotificationSink for BridgeSink {
    async fn announce(
        &self,
        channel: &ChannelRef,
        announcement: &Announcement,
    ) -> Result<AnnouncementRef, SinkError> {
        let path = format!("/channels/{channel}/announcements");
        let response = self
            .send_with_retry(|| {
                self.request(reqwest::Method::POST, &path).json(announcement)
            })
            .await?;

        let body: AnnounceResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Malformed(e.to_string()))?;
        Ok(AnnouncementRef::new(body.id))
    }

    async fn retract(&self, reference: &AnnouncementRef) -> Result<(), SinkError> {
        let path = format!("/announcements/{reference}");
        self.send_with_retry(|| self.request(reqwest::Method::DELETE, &path))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AnnouncementSource for BridgeSink {
    async fn list_recent(
        &self,
        channel: &ChannelRef,
        limit: usize,
    ) -> Result<Vec<PostedAnnouncement>, SinkError> {
        let path = format!("/channels/{channel}/announcements?limit={limit}");
        let response = self
            .send_with_retry(|| self.request(reqwest::Method::GET, &path))
            .await?;

        let listed: Vec<ListedAnnouncement> = response
            .json()
            .await
            .map_err(|e| SinkError::Malformed(e.to_string()))?;

        Ok(listed
            .into_iter()
            .map(|entry| PostedAnnouncement {
                reference: AnnouncementRef::new(entry.id),
                title: entry.title,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(BridgeConfig::new("http://localhost:9000").validate().is_ok());
        assert!(BridgeConfig::new("").validate().is_err());
        assert!(BridgeConfig::new("ftp://example.com").validate().is_err());
        assert!(BridgeConfig::new("http://x")
            .with_timeout(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_sink_rejects_invalid_config() {
        assert!(BridgeSink::from_url("not-a-url").is_err());
        assert!(BridgeSink::from_url("https://bridge.local").is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::new("http://localhost:9000")
            .with_auth_token("secret")
            .with_timeout(15)
            .with_max_retries(5);

        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.max_retries, 5);
    }
}
