//! Store traits: the abstract interfaces for record and preference
//! persistence.
//!
//! These traits keep the catalog storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use reel_core::{PrefKey, PrefMap, PrefValue, Record, RecordId};

use crate::error::Result;
use crate::live::{LiveQuery, PrefWatch};

/// The RecordStore trait: CRUD plus live list queries over the collection.
///
/// # Design Notes
///
/// - **Live lists**: list-shaped queries return a [`LiveQuery`] that keeps
///   re-emitting the full result set after each mutation until dropped.
/// - **Store-assigned ids**: `insert` ignores the caller's id.
/// - **Idempotent deletes**: deleting a missing id is not an error.
/// - **Strict updates**: updating a missing id is [`StoreError::NotFound`].
///
/// [`StoreError::NotFound`]: crate::StoreError::NotFound
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Live Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The full collection, ordered by title ascending (ties by id).
    fn list_all(&self) -> LiveQuery<Vec<Record>>;

    /// Favorites only, same ordering as [`list_all`](RecordStore::list_all).
    fn list_favorites(&self) -> LiveQuery<Vec<Record>>;

    /// Records whose title or creator contains `text`, case-insensitively.
    ///
    /// Empty text is not special-cased: it matches everything.
    fn search(&self, text: &str) -> LiveQuery<Vec<Record>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Point Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record by id.
    async fn get_by_id(&self, id: RecordId) -> Result<Option<Record>>;

    /// Insert a record and return the id the store assigned to it.
    async fn insert(&self, record: &Record) -> Result<RecordId>;

    /// Replace every mutable field of an existing record.
    async fn update(&self, record: &Record) -> Result<()>;

    /// Delete by id. Succeeds whether or not the record exists.
    async fn delete_by_id(&self, id: RecordId) -> Result<()>;

    /// Write the favorite flag of one record.
    async fn set_favorite(&self, id: RecordId, favorite: bool) -> Result<()>;

    /// Write (or clear) the completion timestamp of one record.
    async fn set_completed_at(&self, id: RecordId, at: Option<i64>) -> Result<()>;

    /// Delete by value: removes the record carrying `record.id`.
    async fn delete(&self, record: &Record) -> Result<()> {
        self.delete_by_id(record.id).await
    }
}

/// The PreferenceStore trait: a durable, observable key-value map.
///
/// The whole map is published on a `watch` channel; typed per-key access
/// lives in [`PreferenceStoreExt`]. Writes are applied in call order, so the
/// observed value of a key is always the last one written.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Subscribe to the full preference map.
    fn watch_all(&self) -> watch::Receiver<Arc<PrefMap>>;

    /// Persist a raw value under `name`, then publish it.
    async fn put(&self, name: &str, value: serde_json::Value) -> Result<()>;

    /// Reset every key to its default.
    async fn clear_all(&self) -> Result<()>;
}

/// Typed access to preference keys.
pub trait PreferenceStoreExt: PreferenceStore {
    /// Observe one key: current value first, then each distinct new value.
    fn observe<T: PrefValue>(&self, key: PrefKey<T>) -> PrefWatch<T> {
        PrefWatch::new(self.watch_all(), key)
    }

    /// Read the current value of a key (its default if never written).
    fn current<T: PrefValue>(&self, key: PrefKey<T>) -> T {
        key.read(&self.watch_all().borrow())
    }

    /// Write a typed value.
    fn set<T: PrefValue>(
        &self,
        key: PrefKey<T>,
        value: T,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<P: PreferenceStore + ?Sized> PreferenceStoreExt for P {
    async fn set<T: PrefValue>(&self, key: PrefKey<T>, value: T) -> Result<()> {
        let encoded = key.encode(&value)?;
        self.put(key.name(), encoded).await
    }
}
