//! Record validation for the editing flow.
//!
//! These checks are not part of the store contract: the store accepts any
//! record. The catalog runs them before insert/update when configured to.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;
use crate::record::{Record, MAX_SCORE};

pub const TITLE_MIN: usize = 2;
pub const TITLE_MAX: usize = 100;
pub const CREATOR_MIN: usize = 2;
pub const CREATOR_MAX: usize = 50;
pub const SYNOPSIS_MAX: usize = 1000;

/// Year of the first motion picture.
pub const FIRST_YEAR: i32 = 1888;

/// How far into the future a release year may be.
pub const FUTURE_YEARS: i32 = 5;

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r"(?i)^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
            .expect("url pattern is valid");
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(ValidationError::TitleLength {
            min: TITLE_MIN,
            max: TITLE_MAX,
            len,
        });
    }
    Ok(())
}

pub fn validate_creator(creator: &str) -> Result<(), ValidationError> {
    if creator.trim().is_empty() {
        return Err(ValidationError::BlankCreator);
    }
    let len = creator.chars().count();
    if !(CREATOR_MIN..=CREATOR_MAX).contains(&len) {
        return Err(ValidationError::CreatorLength {
            min: CREATOR_MIN,
            max: CREATOR_MAX,
            len,
        });
    }
    Ok(())
}

/// Check a release year against the first film and `current_year`.
pub fn validate_year(year: i32, current_year: i32) -> Result<(), ValidationError> {
    let max = current_year + FUTURE_YEARS;
    if !(FIRST_YEAR..=max).contains(&year) {
        return Err(ValidationError::YearOutOfRange {
            year,
            min: FIRST_YEAR,
            max,
        });
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<(), ValidationError> {
    if category.trim().is_empty() {
        return Err(ValidationError::BlankCategory);
    }
    Ok(())
}

pub fn validate_score(score: f32) -> Result<(), ValidationError> {
    if !(0.0..=MAX_SCORE).contains(&score) {
        return Err(ValidationError::ScoreOutOfRange(score));
    }
    Ok(())
}

pub fn validate_synopsis(synopsis: &str) -> Result<(), ValidationError> {
    let len = synopsis.chars().count();
    if len > SYNOPSIS_MAX {
        return Err(ValidationError::SynopsisTooLong {
            len,
            max: SYNOPSIS_MAX,
        });
    }
    Ok(())
}

/// The URL is optional; a blank one passes.
pub fn validate_url(url: Option<&str>) -> Result<(), ValidationError> {
    match url.map(str::trim) {
        None | Some("") => Ok(()),
        Some(u) if URL_PATTERN.is_match(u) => Ok(()),
        Some(u) => Err(ValidationError::InvalidUrl(u.to_string())),
    }
}

/// Collect every validation failure for a record.
pub fn validation_errors(record: &Record, current_year: i32) -> Vec<ValidationError> {
    [
        validate_title(&record.title),
        validate_creator(&record.creator),
        validate_year(record.year, current_year),
        validate_category(&record.category),
        validate_score(record.score),
        validate_synopsis(&record.synopsis),
        validate_url(record.resource_url.as_deref()),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect()
}

/// Validate a record, returning the first failure.
pub fn validate_record(record: &Record, current_year: i32) -> Result<(), ValidationError> {
    match validation_errors(record, current_year).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Record {
        Record::new("Alien", "Ridley Scott", 1979, "Horror")
            .score(8.5)
            .resource_url("https://example.com/alien.jpg")
    }

    #[test]
    fn test_valid_record() {
        assert_eq!(validate_record(&valid(), 2026), Ok(()));
    }

    #[test]
    fn test_title_rules() {
        assert_eq!(validate_title("  "), Err(ValidationError::BlankTitle));
        assert!(matches!(validate_title("A"), Err(ValidationError::TitleLength { len: 1, .. })));
        assert!(validate_title(&"x".repeat(101)).is_err());
        assert!(validate_title(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn test_creator_rules() {
        assert_eq!(validate_creator(""), Err(ValidationError::BlankCreator));
        assert!(validate_creator(&"y".repeat(51)).is_err());
    }

    #[test]
    fn test_year_bounds() {
        assert!(validate_year(1887, 2026).is_err());
        assert!(validate_year(1888, 2026).is_ok());
        assert!(validate_year(2031, 2026).is_ok());
        assert!(validate_year(2032, 2026).is_err());
    }

    #[test]
    fn test_score_bounds() {
        assert!(validate_score(-0.1).is_err());
        assert!(validate_score(10.0).is_ok());
        assert!(validate_score(10.5).is_err());
        assert!(validate_score(f32::NAN).is_err());
    }

    #[test]
    fn test_url_rules() {
        assert!(validate_url(None).is_ok());
        assert!(validate_url(Some("")).is_ok());
        assert!(validate_url(Some("example.org")).is_ok());
        assert!(validate_url(Some("http://img.example.org/posters/alien.png")).is_ok());
        assert!(validate_url(Some("not a url")).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let record = Record::new("", "", 1700, "").score(11.0);
        let errors = validation_errors(&record, 2026);
        assert_eq!(errors.len(), 5);
        assert_eq!(errors[0], ValidationError::BlankTitle);
    }
}
