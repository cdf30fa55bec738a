//! Announcement reconciliation
//!
//! Scans the recent announcements in a channel, verifies the code each one
//! carries, and retracts announcements whose codes are no longer valid
//! (expired or unknown). Listing failures abort the scan for that channel;
//! a failed retraction of a single announcement is logged and the scan
//! continues.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::ChannelRef;
use crate::notify::{AnnouncementSource, NotificationSink, SinkError};
use crate::verify::VerificationEngine;

/// Default number of recent announcements scanned per channel
pub const DEFAULT_SCAN_LIMIT: usize = 100;

/// Tally of one reconcile pass over a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Announcements whose codes are still valid
    pub verified: usize,

    /// Announcements retracted (expired or unknown code)
    pub expired: usize,
}

/// Expires previously posted announcements against the live store
pub struct Reconciler {
    engine: Arc<VerificationEngine>,
    announcements: Arc<dyn AnnouncementSource>,
    sink: Arc<dyn NotificationSink>,
    scan_limit: usize,
}

impl Reconciler {
    pub fn new(
        engine: Arc<VerificationEngine>,
        announcements: Arc<dyn AnnouncementSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            engine,
            announcements,
            sink,
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }

    pub fn with_scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = limit;
        self
    }

    /// Reconcile one channel's recent announcements
    ///
    /// Only announcements carrying the code title pattern are considered;
    /// everything else in the channel is ignored.
    ///
    /// # Errors
    ///
    /// Returns the listing failure if the announcement source is
    /// unavailable; retraction failures are logged, not returned.
    pub async fn reconcile_channel(
        &self,
        channel: &ChannelRef,
    ) -> Result<ReconcileReport, SinkError> {
        let posted = self
            .announcements
            .list_recent(channel, self.scan_limit)
            .await?;
        debug!(channel = %channel, scanned = posted.len(), "scanning announcements");

        let mut report = ReconcileReport::default();

        for announcement in posted {
            let Some(code) = announcement.code() else {
                continue;
            };

            let verification = self.engine.verify(&code).await;
            if verification.valid {
                report.verified += 1;
                continue;
            }

            report.expired += 1;
            if let Err(e) = self.sink.retract(&announcement.reference).await {
                warn!(
                    channel = %channel,
                    reference = %announcement.reference,
                    code = %code,
                    error = %e,
                    "failed to retract expired announcement"
                );
            }
        }

        info!(
            channel = %channel,
            verified = report.verified,
            expired = report.expired,
            "channel reconciled"
        );
        Ok(report)
    }
}
