//! axeetech.com gift code source
//!
//! The listing page wraps its code table in a WordPress
//! `figure.wp-block-table` element and embeds explicit expiry dates in the
//! reward column for time-limited codes.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::table::{self, TableScope};
use super::{HttpFetcher, Source, SourceError};
use crate::models::CandidateCode;

pub const DEFAULT_URL: &str = "https://axeetech.com/kingshot-gift-codes/";

/// Source adapter for the axeetech.com code listing
pub struct AxeetechSource {
    fetcher: Arc<HttpFetcher>,
    url: String,
}

impl AxeetechSource {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self::with_url(fetcher, DEFAULT_URL)
    }

    pub fn with_url(fetcher: Arc<HttpFetcher>, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    /// Map raw table rows to candidates
    ///
    /// Rows carrying an explicit "Valid until" date get that expiry and a
    /// generic reward line; rows without one keep the reward text and
    /// default to 30 days out.
    fn candidates_from_html(&self, html: &str) -> Result<Vec<CandidateCode>, SourceError> {
        let rows = table::extract_rows(html, TableScope::FigureWrapped)?;
        let now = Utc::now();

        let candidates = rows
            .into_iter()
            .map(|row| {
                let (valid_until, rewards) = match table::parse_valid_until(&row.reward_text) {
                    Some(until) => (until, "Reward for gift code".to_string()),
                    None => (CandidateCode::default_validity(now), row.reward_text),
                };

                CandidateCode {
                    code: row.code,
                    description: "Gift code from axeetech.com".to_string(),
                    rewards,
                    valid_until,
                    source: self.name().to_string(),
                }
            })
            .collect();

        Ok(candidates)
    }
}

#[async_trait]
impl Source for AxeetechSource {
    fn name(&self) -> &str {
        "axeetech"
    }

    async fn try_fetch(&self) -> Result<Vec<CandidateCode>, SourceError> {
        let html = self.fetcher.fetch_page(&self.url).await?;
        let candidates = self.candidates_from_html(&html)?;
        debug!(source = self.name(), count = candidates.len(), "parsed gift codes");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};

    fn source() -> AxeetechSource {
        AxeetechSource::new(Arc::new(HttpFetcher::new(10).unwrap()))
    }

    const PAGE: &str = r#"
        <html><body>
        <figure class="wp-block-table"><table>
            <tr><th>Code</th><th>Rewards</th></tr>
            <tr><td><strong>KINGSHOT24</strong></td><td>Valid until June 30, 2025</td></tr>
            <tr><td>FRESHSTART</td><td>2x speedups and 500 gems</td></tr>
        </table></figure>
        </body></html>
    "#;

    #[test]
    fn test_explicit_date_wins() {
        let candidates = source().candidates_from_html(PAGE).unwrap();

        assert_eq!(candidates[0].code, "KINGSHOT24");
        assert_eq!(candidates[0].valid_until.year(), 2025);
        assert_eq!(candidates[0].rewards, "Reward for gift code");
    }

    #[test]
    fn test_missing_date_defaults_thirty_days() {
        let candidates = source().candidates_from_html(PAGE).unwrap();
        let lower = Utc::now() + Duration::days(29);

        assert_eq!(candidates[1].code, "FRESHSTART");
        assert_eq!(candidates[1].rewards, "2x speedups and 500 gems");
        assert!(candidates[1].valid_until > lower);
    }

    #[test]
    fn test_candidates_carry_source_name() {
        let candidates = source().candidates_from_html(PAGE).unwrap();
        assert!(candidates.iter().all(|c| c.source == "axeetech"));
    }

    #[test]
    fn test_page_without_table_is_parse_error() {
        let err = source().candidates_from_html("<html></html>").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
