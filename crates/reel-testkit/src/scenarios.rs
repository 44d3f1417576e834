//! Named view scenarios with expected results.
//!
//! Each scenario pins the exact ids a view must show, in order, for a fixed
//! collection and parameter set. They are checked against [`compose`] here
//! and reused by the engine's integration tests.

use reel_core::{compose, Record, RecordId, SortOrder, ViewParams};

use crate::fixtures::sample_collection;

/// A named scenario.
#[derive(Debug, Clone)]
pub struct ViewScenario {
    /// Human-readable name for the scenario.
    pub name: &'static str,
    /// Collection source.
    pub records: fn() -> Vec<Record>,
    pub search_text: &'static str,
    pub favorites_only: bool,
    pub sort_order: SortOrder,
    /// Expected ids, in display order.
    pub expected: &'static [i64],
}

impl ViewScenario {
    pub fn params(&self) -> ViewParams {
        ViewParams {
            search_text: self.search_text.to_string(),
            favorites_only: self.favorites_only,
            sort_order: self.sort_order,
        }
    }

    /// The collection with ids assigned `1..=n`, as a fresh store would.
    pub fn collection(&self) -> Vec<Record> {
        (self.records)()
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.with_id(RecordId::new(i as i64 + 1)))
            .collect()
    }

    pub fn expected_ids(&self) -> Vec<RecordId> {
        self.expected.iter().copied().map(RecordId::new).collect()
    }
}

/// Alien (not a favorite) and Amélie (favorite).
pub fn alien_and_amelie() -> Vec<Record> {
    vec![
        Record::new("Alien", "Ridley Scott", 1979, "Horror").score(8.5),
        Record::new("Amélie", "Jean-Pierre Jeunet", 2001, "Romance")
            .score(8.0)
            .favorite(true),
    ]
}

fn empty() -> Vec<Record> {
    Vec::new()
}

/// Get all scenarios.
pub fn all_scenarios() -> Vec<ViewScenario> {
    vec![
        ViewScenario {
            name: "favorites only keeps Amélie",
            records: alien_and_amelie,
            search_text: "",
            favorites_only: true,
            sort_order: SortOrder::Title,
            expected: &[2],
        },
        ViewScenario {
            name: "search is a case-insensitive substring",
            records: alien_and_amelie,
            search_text: "ali",
            favorites_only: false,
            sort_order: SortOrder::Title,
            expected: &[1],
        },
        ViewScenario {
            name: "rating order, highest first",
            records: alien_and_amelie,
            search_text: "",
            favorites_only: false,
            sort_order: SortOrder::RatingDesc,
            expected: &[1, 2],
        },
        ViewScenario {
            name: "empty collection",
            records: empty,
            search_text: "",
            favorites_only: false,
            sort_order: SortOrder::Title,
            expected: &[],
        },
        ViewScenario {
            name: "title order ignores case, id breaks ties",
            records: sample_collection,
            search_text: "",
            favorites_only: false,
            sort_order: SortOrder::Title,
            expected: &[1, 6, 2, 4, 3, 5],
        },
        ViewScenario {
            name: "year descending, equal years by id",
            records: sample_collection,
            search_text: "",
            favorites_only: false,
            sort_order: SortOrder::YearDesc,
            expected: &[2, 5, 6, 3, 4, 1],
        },
        ViewScenario {
            name: "equal scores by id",
            records: sample_collection,
            search_text: "",
            favorites_only: false,
            sort_order: SortOrder::RatingDesc,
            expected: &[5, 1, 4, 2, 3, 6],
        },
        ViewScenario {
            name: "completion date, never completed last",
            records: sample_collection,
            search_text: "",
            favorites_only: false,
            sort_order: SortOrder::CompletionDesc,
            expected: &[4, 3, 1, 2, 5, 6],
        },
        ViewScenario {
            name: "padded search matches creator",
            records: sample_collection,
            search_text: "  SCOTT ",
            favorites_only: false,
            sort_order: SortOrder::YearDesc,
            expected: &[4, 1],
        },
        ViewScenario {
            name: "blank search with favorites",
            records: sample_collection,
            search_text: "   ",
            favorites_only: true,
            sort_order: SortOrder::Title,
            expected: &[2, 4, 5],
        },
        ViewScenario {
            name: "non-ASCII case folding",
            records: sample_collection,
            search_text: "AMÉ",
            favorites_only: false,
            sort_order: SortOrder::Title,
            expected: &[2],
        },
    ]
}

/// Check every scenario against [`compose`].
pub fn verify_all_scenarios() -> Result<(), String> {
    for scenario in all_scenarios() {
        let actual: Vec<RecordId> = compose(&scenario.collection(), &scenario.params())
            .into_iter()
            .map(|r| r.id)
            .collect();
        if actual != scenario.expected_ids() {
            return Err(format!(
                "{}: expected {:?}, got {:?}",
                scenario.name,
                scenario.expected_ids(),
                actual
            ));
        }
    }
    Ok(())
}
