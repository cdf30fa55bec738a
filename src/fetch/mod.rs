//! External gift-code source adapters
//!
//! Each source retrieves a third-party page and parses its code table into
//! normalized [`CandidateCode`] records. Sources are untrusted adapters: the
//! rest of the service never sees their markup, only the normalized records,
//! and a failure in one source never propagates past its boundary.
//!
//! - [`fetcher`] - shared HTTP client with rate limiting and retry
//! - [`table`] - HTML code-table extraction shared by the site adapters
//! - [`axeetech`] - axeetech.com gift code listing
//! - [`boostbot`] - boostbot.org gift code listing

pub mod axeetech;
pub mod boostbot;
pub mod fetcher;
pub mod table;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use axeetech::AxeetechSource;
pub use boostbot::BoostbotSource;
pub use fetcher::HttpFetcher;

use crate::models::CandidateCode;

/// Errors that can occur while fetching a source page
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,
}

/// Errors that can occur while parsing a source page
#[derive(Error, Debug)]
pub enum ParseError {
    /// No code table in the document
    #[error("No code table found in page")]
    TableNotFound,

    /// Table present but no usable rows
    #[error("Code table contained no code rows")]
    NoRows,
}

/// Failure of one source's fetch-and-parse pass
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// A pluggable external code source
///
/// `try_fetch` exposes the explicit error channel for tests; `fetch` is the
/// boundary the sync engine uses and never raises - failures are logged and
/// an empty list returned, so one broken source cannot block the others.
#[async_trait]
pub trait Source: Send + Sync {
    /// Short name used in logs and candidate records
    fn name(&self) -> &str;

    async fn try_fetch(&self) -> Result<Vec<CandidateCode>, SourceError>;

    async fn fetch(&self) -> Vec<CandidateCode> {
        match self.try_fetch().await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(source = self.name(), error = %e, "source fetch failed, skipping");
                Vec::new()
            }
        }
    }
}
