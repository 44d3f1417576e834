//! Proptest generators for property-based testing.

use proptest::prelude::*;

use reel_core::{Category, Record, RecordId, SortOrder, ViewParams};

/// Generate a title that passes validation.
pub fn title() -> impl Strategy<Value = String> {
    "[A-ZÁÉ][a-zéèäöü ]{1,24}".prop_map(String::from)
}

/// Generate a creator name that passes validation.
pub fn creator() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,12} [A-Z][a-z]{1,12}".prop_map(String::from)
}

/// Generate a plausible release year.
pub fn year() -> impl Strategy<Value = i32> {
    1888i32..=2025
}

/// Generate one of the known categories, as stored.
pub fn category() -> impl Strategy<Value = String> {
    prop::sample::select(Category::ALL.to_vec()).prop_map(String::from)
}

/// Generate a score in tenths, so equal scores actually occur.
pub fn score() -> impl Strategy<Value = f32> {
    (0u8..=100).prop_map(|tenths| tenths as f32 / 10.0)
}

/// Generate an optional completion timestamp (Unix ms).
pub fn completed_at() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(1_500_000_000_000i64..=1_800_000_000_000)
}

/// Generate a SortOrder.
pub fn sort_order() -> impl Strategy<Value = SortOrder> {
    prop_oneof![
        Just(SortOrder::Title),
        Just(SortOrder::YearDesc),
        Just(SortOrder::RatingDesc),
        Just(SortOrder::CompletionDesc),
    ]
}

/// Generate search text, including blank and padded inputs.
pub fn search_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[a-zé]{1,3}".prop_map(String::from),
        " ?[A-Za-z]{1,4} ?".prop_map(String::from),
    ]
}

/// Generate a full set of view parameters.
pub fn view_params() -> impl Strategy<Value = ViewParams> {
    (search_text(), any::<bool>(), sort_order()).prop_map(|(search_text, favorites_only, sort_order)| {
        ViewParams {
            search_text,
            favorites_only,
            sort_order,
        }
    })
}

/// Parameters for generating a record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub title: String,
    pub creator: String,
    pub year: i32,
    pub category: String,
    pub score: f32,
    pub favorite: bool,
    pub completed_at: Option<i64>,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            title(),
            creator(),
            year(),
            category(),
            score(),
            any::<bool>(),
            completed_at(),
        )
            .prop_map(
                |(title, creator, year, category, score, favorite, completed_at)| RecordParams {
                    title,
                    creator,
                    year,
                    category,
                    score,
                    favorite,
                    completed_at,
                },
            )
            .boxed()
    }
}

/// Build an unsaved record from generated parameters.
pub fn record_from_params(params: &RecordParams) -> Record {
    Record::new(
        params.title.clone(),
        params.creator.clone(),
        params.year,
        params.category.clone(),
    )
    .score(params.score)
    .favorite(params.favorite)
    .completed_at(params.completed_at)
}

/// Generate an unsaved record.
pub fn record() -> impl Strategy<Value = Record> {
    any::<RecordParams>().prop_map(|params| record_from_params(&params))
}

/// Generate a collection with distinct ids `1..=n`, as a store would hold it.
pub fn collection(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record(), 0..=max_len).prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| record.with_id(RecordId::new(i as i64 + 1)))
            .collect()
    })
}

/// Generate a collection where some ids repeat, as a misbehaving source
/// might deliver it.
pub fn collection_with_duplicates(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((record(), 1i64..=8), 0..=max_len).prop_map(|records| {
        records
            .into_iter()
            .map(|(record, id)| record.with_id(RecordId::new(id)))
            .collect()
    })
}
