//! View composition: the pure function from (records, parameters) to the
//! visible list.
//!
//! Everything here is synchronous and side-effect free. The engine in
//! `reel-catalog` calls [`compose`] once per upstream change; recomputing
//! with unchanged inputs always yields an identical result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::prefs::SortOrder;
use crate::record::Record;

/// The user-driven parameters that shape the visible list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewParams {
    /// Raw search text as typed. Trimmed before matching.
    pub search_text: String,
    pub favorites_only: bool,
    pub sort_order: SortOrder,
}

impl ViewParams {
    pub fn new(search_text: impl Into<String>, favorites_only: bool, sort_order: SortOrder) -> Self {
        Self {
            search_text: search_text.into(),
            favorites_only,
            sort_order,
        }
    }

    /// Whether a record passes the favorites and search filters.
    pub fn admits(&self, record: &Record) -> bool {
        if self.favorites_only && !record.favorite {
            return false;
        }
        let needle = self.search_text.trim();
        needle.is_empty() || record.matches_text(needle)
    }
}

/// Filter, deduplicate and sort a collection for display.
///
/// Steps, in order:
/// 1. favorites-only retains favorites,
/// 2. non-blank search retains title/creator matches,
/// 3. duplicate ids keep their first occurrence,
/// 4. sort by `params.sort_order`, ties broken by id ascending.
pub fn compose(records: &[Record], params: &ViewParams) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut visible: Vec<Record> = records
        .iter()
        .filter(|r| params.admits(r))
        .filter(|r| seen.insert(r.id))
        .cloned()
        .collect();

    sort_records(&mut visible, params.sort_order);
    visible
}

/// Sort records in place. Total and deterministic for every order.
pub fn sort_records(records: &mut [Record], order: SortOrder) {
    match order {
        // Case-insensitive; the id keeps "alien" and "Alien" in a fixed order.
        SortOrder::Title => records.sort_by_cached_key(|r| (r.title.to_lowercase(), r.id)),
        SortOrder::YearDesc => records.sort_by(|a, b| b.year.cmp(&a.year).then(a.id.cmp(&b.id))),
        SortOrder::RatingDesc => {
            records.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)))
        }
        // None < Some(_), so descending puts never-completed records last.
        SortOrder::CompletionDesc => records.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then(a.id.cmp(&b.id))
        }),
    }
}

/// Snapshot handed to view consumers.
///
/// `loading` stays true until the first complete set of inputs arrived.
/// `error` carries the latest read failure; the records shown alongside it
/// are the last good ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub records: Vec<Record>,
    pub search_text: String,
    pub favorites_only: bool,
    pub sort_order: SortOrder,
    pub loading: bool,
    pub error: Option<String>,
}

impl ViewState {
    /// The initial state, before any input arrived.
    pub fn loading() -> Self {
        Self {
            records: Vec::new(),
            search_text: String::new(),
            favorites_only: false,
            sort_order: SortOrder::default(),
            loading: true,
            error: None,
        }
    }

    /// A ready snapshot composed from the full collection.
    pub fn ready(records: &[Record], params: &ViewParams) -> Self {
        Self {
            records: compose(records, params),
            search_text: params.search_text.clone(),
            favorites_only: params.favorites_only,
            sort_order: params.sort_order,
            loading: false,
            error: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.loading
    }

    /// Ids of the visible records, in display order.
    pub fn ids(&self) -> Vec<crate::RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    fn record(id: i64, title: &str, year: i32, score: f32) -> Record {
        Record::new(title, "Someone", year, "Drama")
            .with_id(RecordId::new(id))
            .score(score)
    }

    #[test]
    fn test_favorites_only_filter() {
        let records = vec![
            record(1, "Alien", 1979, 8.5),
            record(2, "Amélie", 2001, 8.0).favorite(true),
        ];
        let params = ViewParams::new("", true, SortOrder::Title);
        let ids: Vec<_> = compose(&records, &params).iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_search_is_trimmed_and_case_insensitive() {
        let records = vec![record(1, "Alien", 1979, 8.5), record(2, "Amélie", 2001, 8.0)];
        let params = ViewParams::new("  ALI ", false, SortOrder::Title);
        let ids: Vec<_> = compose(&records, &params).iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_blank_search_is_noop() {
        let records = vec![record(1, "Alien", 1979, 8.5), record(2, "Amélie", 2001, 8.0)];
        let params = ViewParams::new("   ", false, SortOrder::Title);
        assert_eq!(compose(&records, &params).len(), 2);
    }

    #[test]
    fn test_title_ties_broken_by_id() {
        let records = vec![record(3, "alien", 1979, 1.0), record(1, "Alien", 1986, 1.0)];
        let sorted = compose(&records, &ViewParams::default());
        assert_eq!(sorted[0].id, RecordId::new(1));
        assert_eq!(sorted[1].id, RecordId::new(3));
    }

    #[test]
    fn test_year_desc() {
        let records = vec![
            record(1, "A", 1979, 0.0),
            record(2, "B", 2001, 0.0),
            record(3, "C", 2001, 0.0),
        ];
        let params = ViewParams::new("", false, SortOrder::YearDesc);
        let ids: Vec<_> = compose(&records, &params).iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_rating_desc() {
        let records = vec![
            record(1, "A", 1979, 8.5),
            record(2, "B", 2001, 8.0),
            record(3, "C", 2001, 9.1),
            record(4, "D", 2001, 8.5),
        ];
        let params = ViewParams::new("", false, SortOrder::RatingDesc);
        let ids: Vec<_> = compose(&records, &params).iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_completion_desc_puts_unwatched_last() {
        let records = vec![
            record(1, "A", 1979, 0.0),
            record(2, "B", 2001, 0.0).completed_at(Some(1_000)),
            record(3, "C", 2001, 0.0).completed_at(Some(5_000)),
            record(4, "D", 2001, 0.0),
        ];
        let params = ViewParams::new("", false, SortOrder::CompletionDesc);
        let ids: Vec<_> = compose(&records, &params).iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let records = vec![record(1, "Alien", 1979, 8.5), record(1, "Alien", 1979, 8.5)];
        assert_eq!(compose(&records, &ViewParams::default()).len(), 1);
    }

    #[test]
    fn test_ready_echoes_params() {
        let params = ViewParams::new(" x", true, SortOrder::YearDesc);
        let state = ViewState::ready(&[], &params);
        assert!(state.is_ready());
        assert_eq!(state.search_text, " x");
        assert!(state.favorites_only);
        assert_eq!(state.sort_order, SortOrder::YearDesc);
        assert!(state.records.is_empty());
    }

    #[test]
    fn test_compose_is_idempotent() {
        let records = vec![
            record(2, "Brazil", 1985, 7.9),
            record(1, "Alien", 1979, 8.5).favorite(true),
        ];
        let params = ViewParams::new("", false, SortOrder::RatingDesc);
        assert_eq!(
            ViewState::ready(&records, &params),
            ViewState::ready(&records, &params)
        );
    }
}
