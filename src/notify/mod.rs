//! Notification contracts and announcement content
//!
//! The core never talks to a chat platform directly. It hands fully-formed
//! announcements (title/description/fields/footer semantics only) to a
//! [`NotificationSink`] and reads previously posted announcements back
//! through an [`AnnouncementSource`]. The concrete transport lives behind
//! those traits; [`webhook`] ships an HTTP bridge adapter.
//!
//! Posted code announcements are recognized later by their title pattern
//! `"Gift Code: <code>"` - the only contract between posting and
//! reconciliation.

pub mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use webhook::{BridgeConfig, BridgeSink};

use crate::models::{AnnouncementRef, ChannelRef, PromoCode};

/// Title prefix carried by every code announcement
pub const CODE_TITLE_PREFIX: &str = "Gift Code: ";

lazy_static! {
    static ref CODE_TITLE: Regex = Regex::new(r"^Gift Code: ([A-Za-z0-9_-]+)$").unwrap();
}

/// Pull the code identity out of an announcement title
///
/// Only titles matching the exact `"Gift Code: <code>"` pattern are
/// candidates; anything else returns `None`.
pub fn extract_code_from_title(title: &str) -> Option<String> {
    CODE_TITLE
        .captures(title.trim())
        .map(|captures| captures[1].to_string())
}

/// Announcement colors (chat-embed accent semantics)
pub mod colors {
    pub const NEW_CODE: u32 = 0x00FF00;
    pub const ARENA: u32 = 0xFF9900;
    pub const BEAR_TRAP: u32 = 0xFF0000;
}

/// One name/value field inside an announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A fully-formed announcement, transport-agnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub color: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub fields: Vec<AnnouncementField>,
    pub footer: String,
}

impl Announcement {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            color: 0,
            title: title.into(),
            description: String::new(),
            fields: Vec::new(),
            footer: String::new(),
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(AnnouncementField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }
}

/// A previously posted announcement as listed by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedAnnouncement {
    pub reference: AnnouncementRef,
    pub title: String,
}

impl PostedAnnouncement {
    /// The embedded code identity, if this is a code announcement
    pub fn code(&self) -> Option<String> {
        extract_code_from_title(&self.title)
    }
}

/// Errors surfaced by the external notification transport
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("transport request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport rejected the request: status {0}")]
    Status(u16),

    #[error("invalid sink configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed transport response: {0}")]
    Malformed(String),
}

/// Outbound announcement channel (consumed, never implemented by the core)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post an announcement, returning the sink's reference to it
    async fn announce(
        &self,
        channel: &ChannelRef,
        announcement: &Announcement,
    ) -> Result<AnnouncementRef, SinkError>;

    /// Take down a previously posted announcement
    async fn retract(&self, reference: &AnnouncementRef) -> Result<(), SinkError>;
}

/// Read-back of recently posted announcements
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    async fn list_recent(
        &self,
        channel: &ChannelRef,
        limit: usize,
    ) -> Result<Vec<PostedAnnouncement>, SinkError>;
}

/// Announcement for one newly synced or added code
pub fn code_announcement(code: &PromoCode) -> Announcement {
    Announcement::new(format!("{CODE_TITLE_PREFIX}{}", code.code))
        .with_color(colors::NEW_CODE)
        .with_description(code.description.clone())
        .with_field("Rewards", code.rewards.clone(), true)
        .with_field(
            "Valid until",
            code.valid_until.format("%Y-%m-%d").to_string(),
            true,
        )
        .with_footer("Automatically synchronized from website")
}

/// Daily Arena battle reminder
pub fn arena_reminder(now: DateTime<Utc>, next_fire: DateTime<Utc>) -> Announcement {
    Announcement::new("Arena Battle Reminder")
        .with_color(colors::ARENA)
        .with_description(
            "The Arena is waiting for brave warriors! \
             Don't forget to participate in Arena battles!",
        )
        .with_field(
            "Next Reminder",
            format!("In {} (daily)", format_time_until(now, next_fire)),
            false,
        )
        .with_footer("KingShot Reminder")
}

/// Recurring Bear Trap event reminder
pub fn bear_trap_reminder(
    now: DateTime<Utc>,
    next_fire: DateTime<Utc>,
    interval_days: u32,
) -> Announcement {
    Announcement::new("Bear Trap Reminder")
        .with_color(colors::BEAR_TRAP)
        .with_description(
            "The Bear Trap event is starting soon! Prepare for battle \
             and don't miss your chance for great rewards!",
        )
        .with_field(
            "Next Reminder",
            format!(
                "In {} (every {interval_days} days)",
                format_time_until(now, next_fire)
            ),
            false,
        )
        .with_footer("KingShot Reminder")
}

/// "3h 20min" style rendering of the gap between two instants
fn format_time_until(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let minutes = (to - from).num_minutes().max(0);
    format!("{}h {}min", minutes / 60, minutes % 60)
}
