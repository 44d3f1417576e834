//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use reel_core::{Record, RecordId};
use reel_store::{MemoryStore, RecordStore, Result};

/// A small, varied collection: mixed favorites, completion dates, equal
/// years and scores, and titles that differ only in case or accents.
pub fn sample_collection() -> Vec<Record> {
    vec![
        Record::new("Alien", "Ridley Scott", 1979, "Horror").score(8.5),
        Record::new("Amélie", "Jean-Pierre Jeunet", 2001, "Romance")
            .score(8.0)
            .favorite(true),
        Record::new("Brazil", "Terry Gilliam", 1985, "Science Fiction")
            .score(7.9)
            .completed_at(Some(1_700_000_000_000)),
        Record::new("Blade Runner", "Ridley Scott", 1982, "Science Fiction")
            .score(8.5)
            .favorite(true)
            .completed_at(Some(1_710_000_000_000)),
        Record::new("Spirited Away", "Hayao Miyazaki", 2001, "Animation")
            .score(9.0)
            .favorite(true),
        Record::new("alien", "Someone Else", 1990, "Comedy").score(3.0),
    ]
}

/// Install a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A test fixture with a shared memory store.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// Create a new fixture with an empty store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Insert records in order, returning the ids the store assigned.
    pub async fn seed(&self, records: &[Record]) -> Result<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.store.insert(record).await?);
        }
        Ok(ids)
    }

    /// Insert [`sample_collection`]. Ids are `1..=6` in listing order.
    pub async fn seed_sample(&self) -> Result<Vec<RecordId>> {
        self.seed(&sample_collection()).await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
