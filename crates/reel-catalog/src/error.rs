//! Error types for the catalog.

use std::fmt;

use reel_core::ValidationError;
use reel_store::StoreError;
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The record failed editing-flow validation and never reached the store.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The write lane shut down before the operation ran.
    #[error("catalog closed")]
    Closed,
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// The mutation a failure report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    ToggleFavorite,
    MarkCompleted,
    SetFavoritesOnly,
    ToggleFavoritesFilter,
    SetSortOrder,
    SetTheme,
    StartSession,
    EndSession,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::ToggleFavorite => "toggle_favorite",
            Operation::MarkCompleted => "mark_completed",
            Operation::SetFavoritesOnly => "set_favorites_only",
            Operation::ToggleFavoritesFilter => "toggle_favorites_filter",
            Operation::SetSortOrder => "set_sort_order",
            Operation::SetTheme => "set_theme",
            Operation::StartSession => "start_session",
            Operation::EndSession => "end_session",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a failed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    Conflict,
    Write,
    Validation,
    Other,
}

impl From<&CatalogError> for FailureKind {
    fn from(err: &CatalogError) -> Self {
        match err {
            CatalogError::Validation(_) => FailureKind::Validation,
            CatalogError::Store(StoreError::NotFound(_)) => FailureKind::NotFound,
            CatalogError::Store(StoreError::Conflict(_)) => FailureKind::Conflict,
            CatalogError::Store(StoreError::Write(_)) => FailureKind::Write,
            _ => FailureKind::Other,
        }
    }
}

/// Out-of-band report of a fire-and-forget mutation that failed.
///
/// Failures never touch the view state; they are only logged and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFailure {
    pub operation: Operation,
    pub kind: FailureKind,
    pub message: String,
}

impl MutationFailure {
    pub fn new(operation: Operation, err: &CatalogError) -> Self {
        Self {
            operation,
            kind: FailureKind::from(err),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({:?}): {}", self.operation, self.kind, self.message)
    }
}
