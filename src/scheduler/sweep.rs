//! Periodic sync-and-reconcile sweep
//!
//! One background task runs the whole maintenance pass on a fixed interval,
//! first pass immediately at startup: reconcile every configured guild
//! channel, then sync new codes from the sources and announce the delta.
//! The sweep runs independently of the reminder timers, so a slow fetch or
//! a large scan never delays a reminder firing.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::models::PromoCode;
use crate::notify::{code_announcement, NotificationSink};
use crate::reconcile::Reconciler;
use crate::store::GuildRegistry;
use crate::sync::{SyncEngine, SyncError};

/// Default hours between sweep passes
pub const DEFAULT_SWEEP_INTERVAL_HOURS: u64 = 6;

/// The periodic maintenance sweep
pub struct Sweeper {
    registry: Arc<GuildRegistry>,
    sync: Arc<SyncEngine>,
    reconciler: Arc<Reconciler>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(
        registry: Arc<GuildRegistry>,
        sync: Arc<SyncEngine>,
        reconciler: Arc<Reconciler>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            sync,
            reconciler,
            sink,
            clock,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_HOURS * 3600),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the sweep loop; the first pass runs immediately
    ///
    /// The loop stops after finishing its in-flight pass once `shutdown`
    /// changes.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_secs = self.interval.as_secs(), "sweep loop started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown.changed() => {
                        info!("sweep loop stopping");
                        break;
                    }
                }
            }
        })
    }

    /// One full pass: reconcile every guild, then sync and announce
    pub async fn run_once(&self) {
        self.reconcile_all_guilds().await;
        self.sync_and_announce().await;
    }

    async fn reconcile_all_guilds(&self) {
        for (guild, config) in self.registry.all().await {
            let Some(channel) = config.code_channel else {
                continue;
            };

            // One guild's failure never aborts the rest of the sweep
            match self.reconciler.reconcile_channel(&channel).await {
                Ok(report) => {
                    debug!(
                        guild = %guild,
                        verified = report.verified,
                        expired = report.expired,
                        "guild reconciled"
                    );
                }
                Err(e) => {
                    warn!(guild = %guild, error = %e, "announcement scan failed");
                    continue;
                }
            }

            if let Err(e) = self
                .registry
                .touch_last_check(&guild, self.clock.now())
                .await
            {
                warn!(guild = %guild, error = %e, "failed to stamp last check");
            }
        }
    }

    async fn sync_and_announce(&self) {
        match self.sync.sync_once().await {
            Ok(outcome) if outcome.added > 0 => {
                info!(added = outcome.added, "announcing new codes");
                self.announce_new_codes(&outcome.new_codes).await;
            }
            Ok(outcome) => {
                debug!(
                    candidates = outcome.total_candidates,
                    "sync found nothing new"
                );
            }
            Err(SyncError::NoCodesFound) => {
                info!("sync found no codes on any source");
            }
            Err(e) => {
                warn!(error = %e, "sync pass failed");
            }
        }
    }

    async fn announce_new_codes(&self, codes: &[PromoCode]) {
        for (guild, config) in self.registry.all().await {
            let Some(channel) = config.code_channel else {
                continue;
            };

            for code in codes {
                if let Err(e) = self
                    .sink
                    .announce(&channel, &code_announcement(code))
                    .await
                {
                    warn!(
                        guild = %guild,
                        code = %code.code,
                        error = %e,
                        "failed to announce new code"
                    );
                }
            }
        }
    }
}
