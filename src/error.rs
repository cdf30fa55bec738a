//! Unified error handling for the giftwatch crate
//!
//! Domain modules keep their own error enums (store, fetch, sync,
//! scheduler, notify); this module consolidates them into a single
//! [`Error`] usable across module boundaries, with a coarse
//! [`ErrorCategory`] for handling strategies.

use std::io;
use thiserror::Error;

pub use crate::fetch::{FetchError, ParseError, SourceError};
pub use crate::notify::SinkError;
pub use crate::scheduler::SchedulerError;
pub use crate::store::StoreError;
pub use crate::sync::SyncError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Scheduler and timing errors
    Scheduler,
    /// Notification transport errors
    Notification,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the giftwatch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Store mutation errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Per-source fetch-and-parse failures
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Sync pass failures
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Scheduler and timing errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Notification transport errors
    #[error("Notification error: {0}")]
    Sink(#[from] SinkError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Source(SourceError::Fetch(_)) => ErrorCategory::Network,
            Self::Source(SourceError::Parse(_)) => ErrorCategory::Parsing,
            Self::Sync(SyncError::Store(_)) => ErrorCategory::Storage,
            Self::Sync(SyncError::NoCodesFound) => ErrorCategory::Network,
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Sink(SinkError::InvalidConfig(_)) => ErrorCategory::Config,
            Self::Sink(_) => ErrorCategory::Notification,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Check if this error is recoverable (worth retrying later)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Network conditions change; the next sweep may succeed
            Self::Fetch(_) | Self::Source(SourceError::Fetch(_)) => true,
            Self::Sync(SyncError::NoCodesFound) => true,
            Self::Sink(SinkError::Http(_)) | Self::Sink(SinkError::Status(_)) => true,
            Self::Io(_) => true,
            // Duplicate adds, bad config and malformed pages will not fix
            // themselves
            Self::Store(_) => false,
            Self::Parse(_) | Self::Source(SourceError::Parse(_)) => false,
            Self::Sync(SyncError::Store(_)) => false,
            Self::Scheduler(_) => false,
            Self::Sink(_) => false,
            Self::Json(_) => false,
            Self::Config(_) => false,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
