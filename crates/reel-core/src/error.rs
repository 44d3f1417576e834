//! Error types for the Reel core.

use thiserror::Error;

/// Validation failures raised by the editing flow before a record is saved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("title must not be blank")]
    BlankTitle,

    #[error("title must be between {min} and {max} characters, got {len}")]
    TitleLength { min: usize, max: usize, len: usize },

    #[error("creator must not be blank")]
    BlankCreator,

    #[error("creator must be between {min} and {max} characters, got {len}")]
    CreatorLength { min: usize, max: usize, len: usize },

    #[error("year {year} is outside {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("a category must be selected")]
    BlankCategory,

    #[error("score {0} is outside 0..=10")]
    ScoreOutOfRange(f32),

    #[error("synopsis is too long: {len} characters (max {max})")]
    SynopsisTooLong { len: usize, max: usize },

    #[error("invalid resource url: {0}")]
    InvalidUrl(String),
}
