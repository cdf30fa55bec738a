//! Recurring scheduling for reminders and maintenance sweeps
//!
//! Two independent timer families live here:
//!
//! - [`reminder`] - per-guild recurring event reminders (Arena daily, Bear
//!   Trap on a configurable multi-day interval), re-derived from persisted
//!   guild configuration at every start. An explicit state machine
//!   (`Unscheduled -> Armed -> Firing -> Armed`) with pure next-fire
//!   arithmetic, so the schedule logic tests without real timers.
//! - [`sweep`] - the periodic sync-and-reconcile pass (first run immediate,
//!   then every 6 hours by default).
//!
//! Timer callbacks are isolated: an error while firing one guild's reminder
//! or sweeping one guild's channel never cancels other timers.
//!
//! [`clock`] provides the injectable time source both use.

pub mod clock;
pub mod error;
pub mod reminder;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SchedulerError, SchedulerResult};
pub use reminder::{
    next_fire_after, next_occurrence, parse_time_of_day, ReminderKind, ReminderScheduler,
    ReminderState, StartFrom, DEFAULT_ARENA_TIME,
};
pub use sweep::{Sweeper, DEFAULT_SWEEP_INTERVAL_HOURS};
