//! Code validity verification
//!
//! Validity is a pure function of store state and the current instant: a
//! code is valid iff it exists and its expiry has not passed. Nothing here
//! has side effects; the reconciler and the command surface both call in.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::models::PromoCode;
use crate::scheduler::clock::Clock;
use crate::store::CodeStore;

/// Why a code failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No code with this identity in the store
    NotFound,
    /// Valid identity, lapsed time
    Expired,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "code does not exist"),
            Self::Expired => write!(f, "code expired"),
        }
    }
}

/// Outcome of verifying one code identity
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub valid: bool,
    pub reason: Option<InvalidReason>,
    /// The stored record, when the identity exists (expired included)
    pub code: Option<PromoCode>,
}

impl Verification {
    pub fn is_expired(&self) -> bool {
        self.reason == Some(InvalidReason::Expired)
    }
}

/// Pure verdict over an optional store record and an explicit instant
pub fn verdict(code: Option<PromoCode>, now: DateTime<Utc>) -> Verification {
    match code {
        None => Verification {
            valid: false,
            reason: Some(InvalidReason::NotFound),
            code: None,
        },
        Some(code) if code.is_expired_at(now) => Verification {
            valid: false,
            reason: Some(InvalidReason::Expired),
            code: Some(code),
        },
        Some(code) => Verification {
            valid: true,
            reason: None,
            code: Some(code),
        },
    }
}

/// Verification engine bound to a store and a clock
pub struct VerificationEngine {
    store: Arc<CodeStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationEngine {
    pub fn new(store: Arc<CodeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn verify(&self, code: &str) -> Verification {
        self.verify_at(code, self.clock.now()).await
    }

    /// Verify against an explicit instant
    pub async fn verify_at(&self, code: &str, now: DateTime<Utc>) -> Verification {
        verdict(self.store.find(code).await, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code_valid_until(until: DateTime<Utc>) -> PromoCode {
        PromoCode {
            code: "CHECK".to_string(),
            description: "test".to_string(),
            rewards: "gems".to_string(),
            valid_until: until,
        }
    }

    #[test]
    fn test_verdict_not_found() {
        let verification = verdict(None, Utc::now());

        assert!(!verification.valid);
        assert_eq!(verification.reason, Some(InvalidReason::NotFound));
        assert!(verification.code.is_none());
    }

    #[test]
    fn test_verdict_expired_keeps_metadata() {
        let now = Utc::now();
        let verification = verdict(Some(code_valid_until(now - Duration::days(1))), now);

        assert!(!verification.valid);
        assert_eq!(verification.reason, Some(InvalidReason::Expired));
        assert!(verification.is_expired());
        // Metadata still included so callers can show what expired
        assert_eq!(verification.code.unwrap().rewards, "gems");
    }

    #[test]
    fn test_verdict_valid() {
        let now = Utc::now();
        let verification = verdict(Some(code_valid_until(now + Duration::days(1))), now);

        assert!(verification.valid);
        assert!(verification.reason.is_none());
        assert!(verification.code.is_some());
    }

    #[test]
    fn test_validity_tracks_the_instant() {
        let now = Utc::now();
        let stored = code_valid_until(now + Duration::hours(1));

        assert!(verdict(Some(stored.clone()), now).valid);
        assert!(!verdict(Some(stored), now + Duration::hours(2)).valid);
    }
}
