//! giftwatch - Gift-code tracker and reminder scheduler
//!
//! A single-process service that keeps a community's KingShot gift codes
//! fresh: it scrapes codes from external listing sites, merges them into a
//! durable store, announces new ones, retracts announcements whose codes
//! have expired, and fires recurring per-guild event reminders.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data records
//! - [`store`] - Durable JSON-document stores (codes, guild configs)
//! - [`fetch`] - External source adapters with rate limiting
//! - [`sync`] - Source-to-store merge engine
//! - [`verify`] - Code validity verification
//! - [`reconcile`] - Expiry of previously posted announcements
//! - [`scheduler`] - Recurring reminder timers and the maintenance sweep
//! - [`notify`] - Notification sink contracts and announcement content
//!
//! Chat-platform glue (commands, permissions, transport) stays outside the
//! crate behind the [`notify`] traits.
//!
//! # Example
//!
//! ```no_run
//! use giftwatch::config::Config;
//! use giftwatch::store::CodeStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = CodeStore::open(&config.store.codes_path);
//!     println!("{} codes known", store.len().await);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod verify;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{
        CandidateCode, ChannelRef, GuildReminderConfig, PromoCode, SyncDelta,
    };
    pub use crate::notify::{Announcement, AnnouncementSource, NotificationSink};
    pub use crate::reconcile::{ReconcileReport, Reconciler};
    pub use crate::scheduler::{ReminderKind, ReminderScheduler, StartFrom, Sweeper};
    pub use crate::store::{CodeStore, GuildRegistry};
    pub use crate::sync::{SyncEngine, SyncOutcome};
    pub use crate::verify::{Verification, VerificationEngine};
}

// Direct re-exports for convenience
pub use error::{Error, Result};
pub use models::{CandidateCode, GuildReminderConfig, PromoCode, SyncDelta};
