// Core data records for the giftwatch service

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default validity window for manually added codes
pub const MANUAL_VALIDITY_DAYS: i64 = 7;

/// Default validity window for scraped codes without an explicit date
pub const SCRAPED_VALIDITY_DAYS: i64 = 30;

/// Guild identifier as handed to us by the command surface
pub type GuildId = String;

/// Opaque reference to an external channel
///
/// The core never interprets the contents; it only hands the reference back
/// to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRef(pub String);

impl ChannelRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque reference to a previously posted announcement, minted by the sink
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnouncementRef(pub String);

impl AnnouncementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AnnouncementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A promotional code known to the store
///
/// Field names on the wire keep the legacy `codes.json` format so data files
/// written by earlier deployments load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Unique, case-sensitive identity
    pub code: String,

    pub description: String,

    pub rewards: String,

    /// Expiry instant; expiry is derived, never stored as a flag
    #[serde(rename = "validUntil")]
    pub valid_until: DateTime<Utc>,
}

impl PromoCode {
    /// Expiry predicate relative to an explicit instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// An unvalidated code record parsed from one external source
///
/// Produced by a fetcher, consumed by the sync engine. `valid_until` is
/// always concrete: fetchers default it to now + 30 days when the source
/// carries no parseable date.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCode {
    pub code: String,
    pub description: String,
    pub rewards: String,
    pub valid_until: DateTime<Utc>,

    /// Name of the source that produced this candidate (logs only)
    pub source: String,
}

impl CandidateCode {
    pub fn into_promo(self) -> PromoCode {
        PromoCode {
            code: self.code,
            description: self.description,
            rewards: self.rewards,
            valid_until: self.valid_until,
        }
    }

    /// Default expiry for candidates without an explicit date
    pub fn default_validity(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(SCRAPED_VALIDITY_DAYS)
    }
}

/// The set of genuinely new codes produced by one sync pass
#[derive(Debug, Clone, Default)]
pub struct SyncDelta {
    pub added: Vec<PromoCode>,
}

impl SyncDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len()
    }
}

fn default_bear_trap_interval() -> u32 {
    2
}

/// Per-guild reminder and channel configuration
///
/// Persisted by the guild registry; field names match the legacy
/// `settings.json` layout. A reminder schedule is active iff its required
/// fields are present and a reminder channel is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildReminderConfig {
    /// Channel new code announcements go to
    #[serde(rename = "channelId")]
    pub code_channel: Option<ChannelRef>,

    /// Channel event reminders go to
    #[serde(rename = "reminderChannelId")]
    pub reminder_channel: Option<ChannelRef>,

    /// Bear Trap fire time as "HH:MM" UTC, parsed on use
    #[serde(rename = "bearTrapTime")]
    pub bear_trap_time: Option<String>,

    /// Days between Bear Trap firings
    #[serde(rename = "bearTrapInterval", default = "default_bear_trap_interval")]
    pub bear_trap_interval_days: u32,

    /// Gates whether an Arena firing actually sends a message
    #[serde(rename = "arenaRemindersEnabled")]
    pub arena_reminders_enabled: bool,

    /// When the last reconcile sweep touched this guild
    #[serde(rename = "lastCheck")]
    pub last_check: Option<DateTime<Utc>>,
}

impl Default for GuildReminderConfig {
    fn default() -> Self {
        Self {
            code_channel: None,
            reminder_channel: None,
            bear_trap_time: None,
            bear_trap_interval_days: default_bear_trap_interval(),
            arena_reminders_enabled: false,
            last_check: None,
        }
    }
}

impl GuildReminderConfig {
    /// Bear Trap schedule is derivable: time configured and channel set
    pub fn bear_trap_configured(&self) -> bool {
        self.bear_trap_time.is_some() && self.reminder_channel.is_some()
    }
}
