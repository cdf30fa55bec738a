//! Durable JSON-document stores
//!
//! Each store persists one JSON document (full snapshot per write) and
//! tolerates corrupt files by backing them up and resetting to empty.
//!
//! - [`codes`] - the append-only promotional code store
//! - [`guilds`] - per-guild reminder configuration registry
//! - [`document`] - shared tolerant-load / atomic-write machinery

pub mod codes;
pub mod document;
pub mod guilds;

use thiserror::Error;

pub use codes::CodeStore;
pub use document::JsonDocument;
pub use guilds::GuildRegistry;

/// Errors surfaced by store mutations
///
/// Corrupt files are not an error here: loads repair them in place (backup
/// and reset) and only log a warning.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The code identity is already present
    #[error("code already exists: {0}")]
    AlreadyExists(String),

    /// Empty or blank code rejected on manual add
    #[error("code cannot be empty")]
    EmptyCode,

    /// The snapshot could not be written durably
    #[error("failed to write store file: {0}")]
    WriteFailure(#[from] std::io::Error),

    /// The snapshot could not be serialized
    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
