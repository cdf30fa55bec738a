//! Common test utilities

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

use giftwatch::models::{AnnouncementRef, ChannelRef, PromoCode};
use giftwatch::notify::{
    Announcement, AnnouncementSource, NotificationSink, PostedAnnouncement, SinkError,
};

/// Create a code expiring `days` from now (negative = already expired)
#[allow(dead_code)]
pub fn code_expiring_in(code: &str, days: i64) -> PromoCode {
    PromoCode {
        code: code.to_string(),
        description: format!("test code {code}"),
        rewards: "100 coins".to_string(),
        valid_until: Utc::now() + Duration::days(days),
    }
}

#[allow(dead_code)]
pub fn code_valid_until(code: &str, until: DateTime<Utc>) -> PromoCode {
    PromoCode {
        code: code.to_string(),
        description: format!("test code {code}"),
        rewards: "100 coins".to_string(),
        valid_until: until,
    }
}

/// In-memory sink recording every announce/retract, doubling as the
/// announcement source for reconciler tests
#[derive(Default)]
pub struct RecordingSink {
    pub announced: Mutex<Vec<(ChannelRef, Announcement)>>,
    pub retracted: Mutex<Vec<AnnouncementRef>>,
    pub listed: Mutex<Vec<PostedAnnouncement>>,
    pub failing_retracts: Mutex<HashSet<String>>,
    counter: Mutex<u64>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload the announcements `list_recent` will return
    #[allow(dead_code)]
    pub fn with_listed(self, listed: Vec<PostedAnnouncement>) -> Self {
        *self.listed.lock().unwrap() = listed;
        self
    }

    /// Make retraction of one reference fail with a server error
    #[allow(dead_code)]
    pub fn fail_retract(&self, reference: &str) {
        self.failing_retracts
            .lock()
            .unwrap()
            .insert(reference.to_string());
    }

    #[allow(dead_code)]
    pub fn announced_count(&self) -> usize {
        self.announced.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn retracted_refs(&self) -> Vec<String> {
        self.retracted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn announce(
        &self,
        channel: &ChannelRef,
        announcement: &Announcement,
    ) -> Result<AnnouncementRef, SinkError> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let reference = AnnouncementRef::new(format!("ann-{}", *counter));
        drop(counter);

        self.announced
            .lock()
            .unwrap()
            .push((channel.clone(), announcement.clone()));
        Ok(reference)
    }

    async fn retract(&self, reference: &AnnouncementRef) -> Result<(), SinkError> {
        if self
            .failing_retracts
            .lock()
            .unwrap()
            .contains(&reference.to_string())
        {
            return Err(SinkError::Status(500));
        }

        self.retracted.lock().unwrap().push(reference.clone());
        Ok(())
    }
}

#[async_trait]
impl AnnouncementSource for RecordingSink {
    async fn list_recent(
        &self,
        _channel: &ChannelRef,
        limit: usize,
    ) -> Result<Vec<PostedAnnouncement>, SinkError> {
        let listed = self.listed.lock().unwrap();
        Ok(listed.iter().take(limit).cloned().collect())
    }
}

/// A posted code announcement as the sink would list it
#[allow(dead_code)]
pub fn posted(reference: &str, code: &str) -> PostedAnnouncement {
    PostedAnnouncement {
        reference: AnnouncementRef::new(reference),
        title: format!("Gift Code: {code}"),
    }
}
