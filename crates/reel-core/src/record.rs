//! Catalog records: the flat entity tracked by the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::RecordId;

/// Inclusive upper bound of a record's score.
pub const MAX_SCORE: f32 = 10.0;

/// A single catalog entry (a movie).
///
/// The id is assigned by the store on insert and is immutable afterwards.
/// Every other field can be changed through an explicit update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    /// Director, author or other creator credit.
    pub creator: String,
    pub year: i32,
    /// Genre label. Usually one of [`Category`], stored as free text.
    pub category: String,
    /// Rating in `0.0..=MAX_SCORE`.
    pub score: f32,
    pub synopsis: String,
    /// External resource (poster, page) URL.
    pub resource_url: Option<String>,
    pub favorite: bool,
    /// When the record was completed (watched), Unix ms.
    pub completed_at: Option<i64>,
    pub notes: String,
}

impl Record {
    /// Create an unsaved record with the required fields.
    ///
    /// Optional fields start empty: no score, no synopsis, not a favorite,
    /// never completed.
    pub fn new(
        title: impl Into<String>,
        creator: impl Into<String>,
        year: i32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::UNASSIGNED,
            title: title.into(),
            creator: creator.into(),
            year,
            category: category.into(),
            score: 0.0,
            synopsis: String::new(),
            resource_url: None,
            favorite: false,
            completed_at: None,
            notes: String::new(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn synopsis(mut self, synopsis: impl Into<String>) -> Self {
        self.synopsis = synopsis.into();
        self
    }

    /// Set the resource URL. A blank string clears it.
    pub fn resource_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.resource_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    pub fn completed_at(mut self, at: Option<i64>) -> Self {
        self.completed_at = at;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Case-insensitive substring match over title or creator.
    ///
    /// The needle is used as given: no trimming, and an empty needle matches
    /// every record.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.creator.to_lowercase().contains(&needle)
    }

    /// Whether the record has been marked completed.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// The fixed set of genres offered by the editing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Action,
    Comedy,
    Drama,
    Horror,
    ScienceFiction,
    Romance,
    Thriller,
    Adventure,
    Fantasy,
    Animation,
    Documentary,
    Musical,
    Western,
    Crime,
    Mystery,
}

impl Category {
    /// All categories, in presentation order.
    pub const ALL: [Category; 15] = [
        Category::Action,
        Category::Comedy,
        Category::Drama,
        Category::Horror,
        Category::ScienceFiction,
        Category::Romance,
        Category::Thriller,
        Category::Adventure,
        Category::Fantasy,
        Category::Animation,
        Category::Documentary,
        Category::Musical,
        Category::Western,
        Category::Crime,
        Category::Mystery,
    ];

    /// Display label, also the value stored in [`Record::category`].
    pub const fn label(self) -> &'static str {
        match self {
            Category::Action => "Action",
            Category::Comedy => "Comedy",
            Category::Drama => "Drama",
            Category::Horror => "Horror",
            Category::ScienceFiction => "Science Fiction",
            Category::Romance => "Romance",
            Category::Thriller => "Thriller",
            Category::Adventure => "Adventure",
            Category::Fantasy => "Fantasy",
            Category::Animation => "Animation",
            Category::Documentary => "Documentary",
            Category::Musical => "Musical",
            Category::Western => "Western",
            Category::Crime => "Crime",
            Category::Mystery => "Mystery",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.label().to_string()
    }
}

/// Error returned when a label is not one of the known categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .or(match wanted.to_ascii_lowercase().as_str() {
                "sci-fi" | "scifi" => Some(Category::ScienceFiction),
                _ => None,
            })
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
