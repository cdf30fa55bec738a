//! Error types for the scheduler module

use thiserror::Error;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Time string did not parse as HH:MM
    #[error("invalid time format '{0}'; expected HH:MM in 24-hour format")]
    InvalidTime(String),

    /// Reminder interval below one day
    #[error("reminder interval must be at least 1 day, got {0}")]
    InvalidInterval(u32),

    /// Guild lacks the configuration a schedule derives from
    #[error("guild {guild} has no {missing} configured")]
    NotConfigured {
        guild: String,
        missing: &'static str,
    },
}

impl SchedulerError {
    pub fn not_configured(guild: impl Into<String>, missing: &'static str) -> Self {
        Self::NotConfigured {
            guild: guild.into(),
            missing,
        }
    }
}
