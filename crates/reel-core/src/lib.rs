//! # Reel Core
//!
//! Pure model for the Reel catalog: records, preference keys, validation and
//! the view composition function.
//!
//! This crate does no I/O. Storage lives in `reel-store`, the reactive engine
//! and mutation façade in `reel-catalog`.
//!
//! ## Key Types
//!
//! - [`Record`] - A catalog entry (a movie)
//! - [`RecordId`] - Store-assigned identifier
//! - [`PrefKey`] - Typed preference key with a static default
//! - [`ViewParams`] / [`ViewState`] - Inputs and output of [`compose`]
//!
//! ## Composition
//!
//! [`compose`] filters by favorites, then by the trimmed search text, then
//! sorts by the active [`SortOrder`] with ties broken by id.

pub mod error;
pub mod prefs;
pub mod record;
pub mod types;
pub mod validation;
pub mod view;

pub use error::ValidationError;
pub use prefs::{keys, PrefKey, PrefMap, PrefValue, SortOrder, ThemeMode};
pub use record::{Category, Record, UnknownCategory, MAX_SCORE};
pub use types::RecordId;
pub use validation::{validate_record, validation_errors};
pub use view::{compose, sort_records, ViewParams, ViewState};
