//! Per-guild reminder configuration registry
//!
//! An explicit owned registry (guild id -> config) injected into the
//! components that need it, with reload-from-disk at construction. Timer
//! state is never persisted here; only the configuration that derives it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use super::{JsonDocument, StoreResult};
use crate::models::{GuildId, GuildReminderConfig};

/// Durable registry of guild reminder configurations
pub struct GuildRegistry {
    doc: JsonDocument<HashMap<GuildId, GuildReminderConfig>>,
    guilds: RwLock<HashMap<GuildId, GuildReminderConfig>>,
}

impl GuildRegistry {
    /// Open the registry at `path`, repairing a corrupt file if present
    pub fn open(path: impl AsRef<Path>) -> Self {
        let doc: JsonDocument<HashMap<GuildId, GuildReminderConfig>> = JsonDocument::new(path.as_ref());
        let guilds = doc.load();
        debug!(count = guilds.len(), path = %path.as_ref().display(), "guild registry opened");
        Self {
            doc,
            guilds: RwLock::new(guilds),
        }
    }

    pub async fn get(&self, guild: &str) -> Option<GuildReminderConfig> {
        self.guilds.read().await.get(guild).cloned()
    }

    /// Snapshot of every registered guild
    pub async fn all(&self) -> Vec<(GuildId, GuildReminderConfig)> {
        self.guilds
            .read()
            .await
            .iter()
            .map(|(id, config)| (id.clone(), config.clone()))
            .collect()
    }

    /// Apply a mutation to one guild's config and persist the registry
    ///
    /// Missing guilds start from the default config. Returns the updated
    /// config so callers can re-derive schedules from it.
    pub async fn update<F>(&self, guild: &str, mutate: F) -> StoreResult<GuildReminderConfig>
    where
        F: FnOnce(&mut GuildReminderConfig),
    {
        let mut guard = self.guilds.write().await;

        let mut next = guard.clone();
        let config = next.entry(guild.to_string()).or_default();
        mutate(config);
        let updated = config.clone();

        self.doc.save(&next)?;
        *guard = next;
        Ok(updated)
    }

    /// Stamp the time of the last reconcile sweep for a guild
    pub async fn touch_last_check(&self, guild: &str, now: DateTime<Utc>) -> StoreResult<()> {
        self.update(guild, |config| config.last_check = Some(now))
            .await?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.guilds.read().await.len()
    }
}
