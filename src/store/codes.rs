//! The promotional code store
//!
//! Append-only collection of known codes, persisted as one JSON document.
//! Codes are never deleted; expiry is a time-relative predicate computed at
//! read time. Mutations hold the write lock across their whole
//! read-check + append + persist sequence, so concurrent callers never see
//! partial state.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{JsonDocument, StoreError, StoreResult};
use crate::models::{CandidateCode, PromoCode, SyncDelta, MANUAL_VALIDITY_DAYS};

/// Durable store of every code the service has ever seen
pub struct CodeStore {
    doc: JsonDocument<Vec<PromoCode>>,
    codes: RwLock<Vec<PromoCode>>,
}

impl CodeStore {
    /// Open the store at `path`, repairing a corrupt file if present
    pub fn open(path: impl AsRef<Path>) -> Self {
        let doc: JsonDocument<Vec<PromoCode>> = JsonDocument::new(path.as_ref());
        let codes = doc.load();
        debug!(count = codes.len(), path = %path.as_ref().display(), "code store opened");
        Self {
            doc,
            codes: RwLock::new(codes),
        }
    }

    /// Manually add a code with the default 7-day validity
    pub async fn add(
        &self,
        code: &str,
        description: Option<&str>,
        rewards: Option<&str>,
    ) -> StoreResult<PromoCode> {
        self.add_at(code, description, rewards, Utc::now()).await
    }

    /// Manual add with an explicit "now", for tests
    pub async fn add_at(
        &self,
        code: &str,
        description: Option<&str>,
        rewards: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<PromoCode> {
        let code = code.trim();
        if code.is_empty() {
            return Err(StoreError::EmptyCode);
        }

        let mut guard = self.codes.write().await;
        if guard.iter().any(|c| c.code == code) {
            return Err(StoreError::AlreadyExists(code.to_string()));
        }

        let entry = PromoCode {
            code: code.to_string(),
            description: description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Gift code: {code}")),
            rewards: rewards
                .map(str::to_string)
                .unwrap_or_else(|| "Reward for gift code".to_string()),
            valid_until: now + Duration::days(MANUAL_VALIDITY_DAYS),
        };

        let mut next = guard.clone();
        next.push(entry.clone());
        self.doc.save(&next)?;
        *guard = next;

        info!(code = %entry.code, valid_until = %entry.valid_until, "code added");
        Ok(entry)
    }

    /// Merge candidates into the store, returning the new-code delta
    ///
    /// A candidate enters the delta iff its code is absent from the current
    /// store. All new entries are appended in one atomic write; re-merging
    /// the same batch yields an empty delta and writes nothing.
    pub async fn merge(&self, candidates: Vec<CandidateCode>) -> StoreResult<SyncDelta> {
        let mut guard = self.codes.write().await;

        let known: HashSet<String> = guard.iter().map(|c| c.code.clone()).collect();
        let mut seen = known;
        let mut added = Vec::new();

        for candidate in candidates {
            if seen.contains(&candidate.code) {
                continue;
            }
            seen.insert(candidate.code.clone());
            added.push(candidate.into_promo());
        }

        if added.is_empty() {
            return Ok(SyncDelta::default());
        }

        let mut next = guard.clone();
        next.extend(added.iter().cloned());
        self.doc.save(&next)?;
        *guard = next;

        info!(added = added.len(), "merged new codes into store");
        Ok(SyncDelta { added })
    }

    /// Full snapshot of the store
    pub async fn all(&self) -> Vec<PromoCode> {
        self.codes.read().await.clone()
    }

    /// Look up a single code by identity (case-sensitive)
    pub async fn find(&self, code: &str) -> Option<PromoCode> {
        self.codes.read().await.iter().find(|c| c.code == code).cloned()
    }

    pub async fn contains(&self, code: &str) -> bool {
        self.codes.read().await.iter().any(|c| c.code == code)
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn candidate(code: &str, valid_until: DateTime<Utc>) -> CandidateCode {
        CandidateCode {
            code: code.to_string(),
            description: format!("Gift code from test: {code}"),
            rewards: "100 coins".to_string(),
            valid_until,
            source: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_assigns_default_validity() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));
        let now = Utc::now();

        let added = store.add_at("WELCOME", None, None, now).await.unwrap();
        assert_eq!(added.valid_until, now + Duration::days(7));
        assert_eq!(added.description, "Gift code: WELCOME");
    }

    #[tokio::test]
    async fn test_add_duplicate_fails() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));

        store.add("WELCOME", None, None).await.unwrap();
        let err = store.add("WELCOME", None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(c) if c == "WELCOME"));
    }

    #[tokio::test]
    async fn test_add_blank_code_rejected() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));

        let err = store.add("   ", None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyCode));
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));
        let now = Utc::now();

        let batch = vec![candidate("A", now), candidate("B", now)];
        let first = store.merge(batch.clone()).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = store.merge(batch).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_merge_skips_known_codes_only() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));
        let now = Utc::now();

        store.add_at("A", None, None, now).await.unwrap();
        let delta = store
            .merge(vec![candidate("A", now), candidate("B", now)])
            .await
            .unwrap();

        assert_eq!(delta.len(), 1);
        assert_eq!(delta.added[0].code, "B");
    }

    #[tokio::test]
    async fn test_merge_dedups_within_batch() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));
        let now = Utc::now();

        let mut first = candidate("X", now);
        first.rewards = "first".to_string();
        let mut second = candidate("X", now);
        second.rewards = "second".to_string();

        let delta = store.merge(vec![first, second]).await.unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta.added[0].rewards, "first");
    }

    #[tokio::test]
    async fn test_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.json");

        {
            let store = CodeStore::open(&path);
            store.add("PERSIST", None, None).await.unwrap();
        }

        let reopened = CodeStore::open(&path);
        assert!(reopened.contains("PERSIST").await);
    }

    #[tokio::test]
    async fn test_find_is_case_sensitive() {
        let dir = tempdir().unwrap();
        let store = CodeStore::open(dir.path().join("codes.json"));

        store.add("Mixed", None, None).await.unwrap();
        assert!(store.find("Mixed").await.is_some());
        assert!(store.find("mixed").await.is_none());
    }
}
