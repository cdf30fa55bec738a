//! boostbot.org gift code source
//!
//! The listing page uses a bare two-column table with no expiry dates, so
//! every candidate gets the default 30-day validity.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::table::{self, TableScope};
use super::{HttpFetcher, Source, SourceError};
use crate::models::CandidateCode;

pub const DEFAULT_URL: &str = "https://boostbot.org/blog/kingshot-gift-codes/";

/// Source adapter for the boostbot.org code listing
pub struct BoostbotSource {
    fetcher: Arc<HttpFetcher>,
    url: String,
}

impl BoostbotSource {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self::with_url(fetcher, DEFAULT_URL)
    }

    pub fn with_url(fetcher: Arc<HttpFetcher>, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    fn candidates_from_html(&self, html: &str) -> Result<Vec<CandidateCode>, SourceError> {
        let rows = table::extract_rows(html, TableScope::FirstTable)?;
        let now = Utc::now();

        let candidates = rows
            .into_iter()
            .map(|row| CandidateCode {
                code: row.code,
                description: "Gift code from boostbot.org".to_string(),
                rewards: row.reward_text,
                valid_until: CandidateCode::default_validity(now),
                source: self.name().to_string(),
            })
            .collect();

        Ok(candidates)
    }
}

#[async_trait]
impl Source for BoostbotSource {
    fn name(&self) -> &str {
        "boostbot"
    }

    async fn try_fetch(&self) -> Result<Vec<CandidateCode>, SourceError> {
        let html = self.fetcher.fetch_page(&self.url).await?;
        let candidates = self.candidates_from_html(&html)?;
        debug!(source = self.name(), count = candidates.len(), "parsed gift codes");
        Ok(candidates)
    }
}
