//! Recurring reminder state machine
//!
//! One timer per guild x reminder kind. The schedule is never persisted;
//! it is re-derived from the guild registry at startup and on every
//! re-configuration. Arming a key cancels any timer already live for it,
//! so re-configuring can never leave two timers firing for one guild.
//!
//! The next-fire arithmetic is pure (`next_occurrence`, `next_fire_after`)
//! and tested without timers; the timer tasks only sleep until the computed
//! instant and hand the send to the notification sink.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::error::{SchedulerError, SchedulerResult};
use crate::models::{GuildId, GuildReminderConfig};
use crate::notify::{arena_reminder, bear_trap_reminder, NotificationSink};
use crate::store::GuildRegistry;

/// Default Arena reminder time (UTC)
pub const DEFAULT_ARENA_TIME: &str = "23:30";

/// The two recurring reminder kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderKind {
    /// Daily, fixed service-wide time; the per-guild flag gates the send
    Arena,
    /// Per-guild time and multi-day interval
    BearTrap,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arena => "arena",
            Self::BearTrap => "bear_trap",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which day the first occurrence may fall on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFrom {
    /// Today if the target time is still ahead, otherwise tomorrow
    #[default]
    Today,
    /// Skip to tomorrow unconditionally
    Tomorrow,
}

/// Observable state of one guild x kind schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Unscheduled,
    Armed(DateTime<Utc>),
    Firing,
}

/// Parse a "HH:MM" 24-hour time-of-day string
pub fn parse_time_of_day(raw: &str) -> SchedulerResult<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| SchedulerError::InvalidTime(raw.to_string()))
}

/// Next occurrence of `time_of_day` strictly after `now`
///
/// An occurrence landing exactly on `now` counts as already passed and
/// rolls to the next day, so a firing at the boundary never repeats.
pub fn next_occurrence(
    time_of_day: NaiveTime,
    now: DateTime<Utc>,
    start: StartFrom,
) -> DateTime<Utc> {
    let mut next = now.date_naive().and_time(time_of_day).and_utc();
    if start == StartFrom::Tomorrow || next <= now {
        next = next + Duration::days(1);
    }
    next
}

/// The firing after `fired_at`: `interval_days` later at the same time-of-day
pub fn next_fire_after(
    fired_at: DateTime<Utc>,
    time_of_day: NaiveTime,
    interval_days: u32,
) -> DateTime<Utc> {
    (fired_at.date_naive() + Duration::days(i64::from(interval_days)))
        .and_time(time_of_day)
        .and_utc()
}

type TimerKey = (GuildId, ReminderKind);

/// Owner of all reminder timers
pub struct ReminderScheduler {
    registry: Arc<GuildRegistry>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    arena_time: NaiveTime,
    timers: Mutex<HashMap<TimerKey, JoinHandle<()>>>,
    states: Mutex<HashMap<TimerKey, ReminderState>>,
}

impl ReminderScheduler {
    pub fn new(
        registry: Arc<GuildRegistry>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        arena_time: NaiveTime,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            sink,
            clock,
            arena_time,
            timers: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        })
    }

    /// Re-derive every schedule from the registry at process start
    ///
    /// Arena is armed for every registered guild regardless of the enabled
    /// flag (the flag gates only the send); Bear Trap is armed where a time
    /// is configured. Both use `StartFrom::Today`.
    pub async fn start(self: &Arc<Self>) {
        for (guild, config) in self.registry.all().await {
            if let Err(e) = self.arm(&guild, ReminderKind::Arena, StartFrom::Today).await {
                warn!(guild = %guild, error = %e, "could not arm arena reminder");
            }

            if config.bear_trap_time.is_some() {
                if let Err(e) = self
                    .arm(&guild, ReminderKind::BearTrap, StartFrom::Today)
                    .await
                {
                    warn!(guild = %guild, error = %e, "could not arm bear trap reminder");
                }
            }
        }
        info!(timers = self.live_timers(), "reminder scheduler started");
    }

    /// Arm (or re-arm) one guild x kind schedule
    ///
    /// Any timer already live for the key is cancelled before the fresh
    /// next-fire instant is computed from "now".
    pub async fn arm(
        self: &Arc<Self>,
        guild: &str,
        kind: ReminderKind,
        start: StartFrom,
    ) -> SchedulerResult<DateTime<Utc>> {
        let config = self.registry.get(guild).await.unwrap_or_default();
        let (time_of_day, interval_days) = self.schedule_params(guild, kind, &config)?;

        let first = next_occurrence(time_of_day, self.clock.now(), start);
        self.spawn_timer(guild, kind, time_of_day, interval_days, first);

        info!(guild, kind = %kind, next = %first, "reminder armed");
        Ok(first)
    }

    /// Cancel one guild x kind schedule
    pub fn disarm(&self, guild: &str, kind: ReminderKind) {
        let key = (guild.to_string(), kind);
        if let Some(task) = self.timers.lock().unwrap().remove(&key) {
            task.abort();
            info!(guild, kind = %kind, "reminder disarmed");
        }
        self.set_state(&key, ReminderState::Unscheduled);
    }

    /// Re-derive both schedules for a guild after a configuration change
    pub async fn rearm_guild(self: &Arc<Self>, guild: &str) {
        if let Err(e) = self.arm(guild, ReminderKind::Arena, StartFrom::Today).await {
            warn!(guild, error = %e, "could not re-arm arena reminder");
        }

        let config = self.registry.get(guild).await.unwrap_or_default();
        if config.bear_trap_time.is_some() {
            if let Err(e) = self
                .arm(guild, ReminderKind::BearTrap, StartFrom::Today)
                .await
            {
                warn!(guild, error = %e, "could not re-arm bear trap reminder");
            }
        } else {
            self.disarm(guild, ReminderKind::BearTrap);
        }
    }

    /// Observable state for one key
    pub fn state(&self, guild: &str, kind: ReminderKind) -> ReminderState {
        self.states
            .lock()
            .unwrap()
            .get(&(guild.to_string(), kind))
            .copied()
            .unwrap_or(ReminderState::Unscheduled)
    }

    /// Number of timer tasks that are still live
    pub fn live_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap()
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Cancel every timer
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (key, task) in timers.drain() {
            task.abort();
            self.set_state(&key, ReminderState::Unscheduled);
        }
        info!("reminder scheduler stopped");
    }

    fn schedule_params(
        &self,
        guild: &str,
        kind: ReminderKind,
        config: &GuildReminderConfig,
    ) -> SchedulerResult<(NaiveTime, u32)> {
        match kind {
            ReminderKind::Arena => Ok((self.arena_time, 1)),
            ReminderKind::BearTrap => {
                let raw = config
                    .bear_trap_time
                    .as_deref()
                    .ok_or_else(|| SchedulerError::not_configured(guild, "bear trap time"))?;
                let time_of_day = parse_time_of_day(raw)?;

                if config.bear_trap_interval_days < 1 {
                    return Err(SchedulerError::InvalidInterval(
                        config.bear_trap_interval_days,
                    ));
                }

                Ok((time_of_day, config.bear_trap_interval_days))
            }
        }
    }

    fn spawn_timer(
        self: &Arc<Self>,
        guild: &str,
        kind: ReminderKind,
        time_of_day: NaiveTime,
        interval_days: u32,
        first: DateTime<Utc>,
    ) {
        let key: TimerKey = (guild.to_string(), kind);

        // Cancel-then-spawn under the lock so two timers can never be live
        // for the same key
        let mut timers = self.timers.lock().unwrap();
        if let Some(previous) = timers.remove(&key) {
            previous.abort();
            debug!(guild, kind = %kind, "previous timer cancelled");
        }

        self.set_state(&key, ReminderState::Armed(first));

        let task = {
            let scheduler = Arc::clone(self);
            let key = key.clone();
            tokio::spawn(async move {
                let mut next = first;
                loop {
                    let wait = (next - scheduler.clock.now()).to_std().unwrap_or_default();
                    tokio::time::sleep(wait).await;

                    scheduler.set_state(&key, ReminderState::Firing);
                    let upcoming = next_fire_after(next, time_of_day, interval_days);
                    scheduler.fire(&key.0, kind, upcoming, interval_days).await;
                    scheduler.set_state(&key, ReminderState::Armed(upcoming));
                    next = upcoming;
                }
            })
        };

        timers.insert(key, task);
    }

    /// Execute one firing: look up the live config, skip sends the config
    /// gates off, and isolate every failure to this guild
    async fn fire(
        &self,
        guild: &str,
        kind: ReminderKind,
        upcoming: DateTime<Utc>,
        interval_days: u32,
    ) {
        let Some(config) = self.registry.get(guild).await else {
            debug!(guild, kind = %kind, "guild no longer registered, skipping send");
            return;
        };

        let Some(channel) = config.reminder_channel.clone() else {
            debug!(guild, kind = %kind, "no reminder channel configured, skipping send");
            return;
        };

        if kind == ReminderKind::Arena && !config.arena_reminders_enabled {
            debug!(guild, "arena reminders disabled, skipping send");
            return;
        }

        let now = self.clock.now();
        let announcement = match kind {
            ReminderKind::Arena => arena_reminder(now, upcoming),
            ReminderKind::BearTrap => bear_trap_reminder(now, upcoming, interval_days),
        };

        match self.sink.announce(&channel, &announcement).await {
            Ok(_) => info!(guild, kind = %kind, next = %upcoming, "reminder sent"),
            Err(e) => warn!(guild, kind = %kind, error = %e, "failed to send reminder"),
        }
    }

    fn set_state(&self, key: &TimerKey, state: ReminderState) {
        self.states.lock().unwrap().insert(key.clone(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn tod(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("10:30").unwrap(), tod(10, 30));
        assert_eq!(parse_time_of_day(" 23:59 ").unwrap(), tod(23, 59));

        assert!(matches!(
            parse_time_of_day("25:00"),
            Err(SchedulerError::InvalidTime(_))
        ));
        assert!(parse_time_of_day("10:3x").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn test_next_occurrence_today_when_still_ahead() {
        let now = utc(2025, 6, 10, 9, 0);
        let next = next_occurrence(tod(10, 0), now, StartFrom::Today);
        assert_eq!(next, utc(2025, 6, 10, 10, 0));
    }

    #[test]
    fn test_next_occurrence_rolls_to_tomorrow_when_passed() {
        let now = utc(2025, 6, 10, 11, 0);
        let next = next_occurrence(tod(10, 0), now, StartFrom::Today);
        assert_eq!(next, utc(2025, 6, 11, 10, 0));
    }

    #[test]
    fn test_next_occurrence_boundary_counts_as_passed() {
        let now = utc(2025, 6, 10, 10, 0);
        let next = next_occurrence(tod(10, 0), now, StartFrom::Today);
        assert_eq!(next, utc(2025, 6, 11, 10, 0));
    }

    #[test]
    fn test_next_occurrence_tomorrow_is_unconditional() {
        let now = utc(2025, 6, 10, 9, 0);
        let next = next_occurrence(tod(10, 0), now, StartFrom::Tomorrow);
        assert_eq!(next, utc(2025, 6, 11, 10, 0));
    }

    #[test]
    fn test_next_fire_after_uses_interval_and_time_of_day() {
        let fired = utc(2025, 6, 10, 10, 0);
        assert_eq!(
            next_fire_after(fired, tod(10, 0), 2),
            utc(2025, 6, 12, 10, 0)
        );
        assert_eq!(
            next_fire_after(fired, tod(10, 0), 1),
            utc(2025, 6, 11, 10, 0)
        );
    }

    #[test]
    fn test_next_fire_after_ignores_fire_delay() {
        // A firing that ran late still schedules from its nominal date
        let fired_late = utc(2025, 6, 10, 10, 7);
        assert_eq!(
            next_fire_after(fired_late, tod(10, 0), 2),
            utc(2025, 6, 12, 10, 0)
        );
    }

    #[test]
    fn test_next_occurrence_crosses_month_boundary() {
        let now = utc(2025, 6, 30, 23, 45);
        let next = next_occurrence(tod(23, 30), now, StartFrom::Today);
        assert_eq!(next, utc(2025, 7, 1, 23, 30));
    }
}
