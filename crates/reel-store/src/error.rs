//! Error types for the store module.

use reel_core::{Record, RecordId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Update or targeted write referencing an id that does not exist.
    /// Deletes are idempotent and never raise this.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Store-level uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failed (storage unavailable, disk full, ...).
    #[error("write failed: {0}")]
    Write(String),

    /// A live query could not be (re)established.
    #[error("live query failed: {0}")]
    TransientRead(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Value serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Reject records the store cannot hold faithfully.
///
/// A NaN score never compares equal to itself, which would make every
/// re-query of an unchanged collection look like a change.
pub(crate) fn check_storable(record: &Record) -> Result<()> {
    if !record.score.is_finite() {
        return Err(StoreError::InvalidData(format!(
            "score of {} is not a finite number",
            record.id
        )));
    }
    Ok(())
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
