//! Code synchronization engine
//!
//! One sync pass fans out over every configured source, combines the
//! candidates, deduplicates them by code (first occurrence wins), and
//! merges the batch into the store. The delta of genuinely new codes is
//! returned for announcement.
//!
//! Zero candidates across all sources is a failure ("no codes found") and
//! leaves the store untouched; candidates that are all already known is a
//! success with an empty delta.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::fetch::Source;
use crate::models::{CandidateCode, PromoCode};
use crate::store::{CodeStore, StoreError};

/// Why a sync pass failed
#[derive(Error, Debug)]
pub enum SyncError {
    /// Every source came back empty
    #[error("no codes found on any source")]
    NoCodesFound,

    /// The store could not persist the delta
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one successful sync pass
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Number of genuinely new codes
    pub added: usize,

    /// The new codes themselves, for announcement
    pub new_codes: Vec<PromoCode>,

    /// Unique candidates seen across all sources this pass
    pub total_candidates: usize,
}

/// Merges candidates from all sources into the code store
pub struct SyncEngine {
    store: Arc<CodeStore>,
    sources: Vec<Arc<dyn Source>>,
}

impl SyncEngine {
    pub fn new(store: Arc<CodeStore>, sources: Vec<Arc<dyn Source>>) -> Self {
        Self { store, sources }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run one full sync pass
    pub async fn sync_once(&self) -> Result<SyncOutcome, SyncError> {
        let batches = join_all(self.sources.iter().map(|source| source.fetch())).await;
        let combined: Vec<CandidateCode> = batches.into_iter().flatten().collect();

        if combined.is_empty() {
            return Err(SyncError::NoCodesFound);
        }

        let candidates = dedup_first_seen(combined);
        let total_candidates = candidates.len();
        debug!(candidates = total_candidates, "combined source candidates");

        let delta = self.store.merge(candidates).await?;

        info!(
            added = delta.len(),
            candidates = total_candidates,
            "sync pass completed"
        );

        Ok(SyncOutcome {
            added: delta.len(),
            new_codes: delta.added,
            total_candidates,
        })
    }
}

/// Deduplicate a combined batch by code, first occurrence wins
fn dedup_first_seen(candidates: Vec<CandidateCode>) -> Vec<CandidateCode> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.code.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SourceError;
    use async_trait::async_trait;
    use chrono::Utc;
    use tempfile::tempdir;

    struct StaticSource {
        name: &'static str,
        candidates: Vec<CandidateCode>,
        fail: bool,
    }

    impl StaticSource {
        fn of(name: &'static str, codes: &[&str]) -> Arc<Self> {
            let candidates = codes
                .iter()
                .map(|code| CandidateCode {
                    code: code.to_string(),
                    description: format!("from {name}"),
                    rewards: format!("{name} reward"),
                    valid_until: Utc::now() + chrono::Duration::days(30),
                    source: name.to_string(),
                })
                .collect();
            Arc::new(Self {
                name,
                candidates,
                fail: false,
            })
        }

        fn broken(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                candidates: Vec::new(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Source for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn try_fetch(&self) -> Result<Vec<CandidateCode>, SourceError> {
            if self.fail {
                Err(SourceError::Parse(crate::fetch::ParseError::TableNotFound))
            } else {
                Ok(self.candidates.clone())
            }
        }
    }

    fn engine(dir: &tempfile::TempDir, sources: Vec<Arc<dyn Source>>) -> SyncEngine {
        let store = Arc::new(CodeStore::open(dir.path().join("codes.json")));
        SyncEngine::new(store, sources)
    }

    #[tokio::test]
    async fn test_sync_merges_all_sources() {
        let dir = tempdir().unwrap();
        let engine = engine(
            &dir,
            vec![
                StaticSource::of("one", &["A", "B"]),
                StaticSource::of("two", &["C"]),
            ],
        );

        let outcome = engine.sync_once().await.unwrap();
        assert_eq!(outcome.added, 3);
        assert_eq!(outcome.total_candidates, 3);
    }

    #[tokio::test]
    async fn test_duplicate_across_sources_first_seen_wins() {
        let dir = tempdir().unwrap();
        let engine = engine(
            &dir,
            vec![
                StaticSource::of("one", &["X"]),
                StaticSource::of("two", &["X"]),
            ],
        );

        let outcome = engine.sync_once().await.unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.new_codes[0].rewards, "one reward");
    }

    #[tokio::test]
    async fn test_no_candidates_is_failure_and_store_untouched() {
        let dir = tempdir().unwrap();
        let engine = engine(&dir, vec![StaticSource::of("empty", &[])]);

        let err = engine.sync_once().await.unwrap_err();
        assert!(matches!(err, SyncError::NoCodesFound));
        assert!(!dir.path().join("codes.json").exists());
    }

    #[tokio::test]
    async fn test_nothing_new_is_success_not_failure() {
        let dir = tempdir().unwrap();
        let engine = engine(&dir, vec![StaticSource::of("one", &["A"])]);

        engine.sync_once().await.unwrap();
        let second = engine.sync_once().await.unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(second.total_candidates, 1);
        assert!(second.new_codes.is_empty());
    }

    #[tokio::test]
    async fn test_broken_source_does_not_block_others() {
        let dir = tempdir().unwrap();
        let engine = engine(
            &dir,
            vec![StaticSource::broken("down"), StaticSource::of("up", &["A"])],
        );

        let outcome = engine.sync_once().await.unwrap();
        assert_eq!(outcome.added, 1);
    }

    #[tokio::test]
    async fn test_all_sources_broken_reports_no_codes() {
        let dir = tempdir().unwrap();
        let engine = engine(
            &dir,
            vec![StaticSource::broken("a"), StaticSource::broken("b")],
        );

        assert!(matches!(
            engine.sync_once().await.unwrap_err(),
            SyncError::NoCodesFound
        ));
    }
}
