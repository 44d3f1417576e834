//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence, and it can be told to
//! fail reads or writes to exercise error paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use reel_core::{PrefMap, Record, RecordId};

use crate::error::{check_storable, Result, StoreError};
use crate::live::{LiveQuery, QueryFn, QueryFuture};
use crate::traits::{PreferenceStore, RecordStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
    faults: Arc<Faults>,
    /// Record revision, bumped after every successful record mutation.
    changes: watch::Sender<u64>,
    prefs: watch::Sender<Arc<PrefMap>>,
}

struct MemoryStoreInner {
    records: BTreeMap<RecordId, Record>,
    last_id: i64,
}

#[derive(Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        let (prefs, _) = watch::channel(Arc::new(PrefMap::new()));
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner {
                records: BTreeMap::new(),
                last_id: 0,
            })),
            faults: Arc::new(Faults::default()),
            changes,
            prefs,
        }
    }

    /// Make every read (live queries and `get_by_id`) fail with
    /// [`StoreError::TransientRead`] until switched off.
    pub fn set_fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with [`StoreError::Write`] until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Force live queries to re-run without changing any data.
    pub fn touch(&self) {
        self.changes.send_modify(|rev| *rev += 1);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        read_lock(&self.inner).map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live queries and preference watchers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count() + self.prefs.receiver_count()
    }

    fn check_write(&self) -> Result<()> {
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("injected write failure".into()));
        }
        Ok(())
    }

    fn live<F>(&self, filter: F) -> LiveQuery<Vec<Record>>
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let faults = Arc::clone(&self.faults);
        let query: QueryFn<Vec<Record>> = Arc::new(move || -> QueryFuture<Vec<Record>> {
            let result = collect_sorted(&inner, &faults, &filter);
            Box::pin(async move { result })
        });
        LiveQuery::new(self.changes.subscribe(), query)
    }

    fn publish(&self) {
        self.changes.send_modify(|rev| *rev += 1);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_lock(lock: &RwLock<MemoryStoreInner>) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
    lock.read()
        .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
}

fn write_lock(lock: &RwLock<MemoryStoreInner>) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
    lock.write()
        .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
}

/// Snapshot the records passing `filter`, ordered by title then id.
fn collect_sorted(
    lock: &RwLock<MemoryStoreInner>,
    faults: &Faults,
    filter: &dyn Fn(&Record) -> bool,
) -> Result<Vec<Record>> {
    if faults.reads.load(Ordering::SeqCst) {
        return Err(StoreError::TransientRead("injected read failure".into()));
    }
    let inner = read_lock(lock)?;
    let mut records: Vec<Record> = inner.records.values().filter(|r| filter(r)).cloned().collect();
    records.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    Ok(records)
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn list_all(&self) -> LiveQuery<Vec<Record>> {
        self.live(|_| true)
    }

    fn list_favorites(&self) -> LiveQuery<Vec<Record>> {
        self.live(|r| r.favorite)
    }

    fn search(&self, text: &str) -> LiveQuery<Vec<Record>> {
        let needle = text.to_string();
        self.live(move |r| r.matches_text(&needle))
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<Record>> {
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(StoreError::TransientRead("injected read failure".into()));
        }
        let inner = read_lock(&self.inner)?;
        Ok(inner.records.get(&id).cloned())
    }

    async fn insert(&self, record: &Record) -> Result<RecordId> {
        check_storable(record)?;
        self.check_write()?;
        let id = {
            let mut inner = write_lock(&self.inner)?;
            inner.last_id += 1;
            let id = RecordId::new(inner.last_id);
            inner.records.insert(id, record.clone().with_id(id));
            id
        };
        self.publish();
        Ok(id)
    }

    async fn update(&self, record: &Record) -> Result<()> {
        check_storable(record)?;
        self.check_write()?;
        {
            let mut inner = write_lock(&self.inner)?;
            let slot = inner
                .records
                .get_mut(&record.id)
                .ok_or(StoreError::NotFound(record.id))?;
            *slot = record.clone();
        }
        self.publish();
        Ok(())
    }

    async fn delete_by_id(&self, id: RecordId) -> Result<()> {
        self.check_write()?;
        let removed = write_lock(&self.inner)?.records.remove(&id).is_some();
        if removed {
            self.publish();
        }
        Ok(())
    }

    async fn set_favorite(&self, id: RecordId, favorite: bool) -> Result<()> {
        self.check_write()?;
        {
            let mut inner = write_lock(&self.inner)?;
            let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            record.favorite = favorite;
        }
        self.publish();
        Ok(())
    }

    async fn set_completed_at(&self, id: RecordId, at: Option<i64>) -> Result<()> {
        self.check_write()?;
        {
            let mut inner = write_lock(&self.inner)?;
            let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            record.completed_at = at;
        }
        self.publish();
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    fn watch_all(&self) -> watch::Receiver<Arc<PrefMap>> {
        self.prefs.subscribe()
    }

    async fn put(&self, name: &str, value: serde_json::Value) -> Result<()> {
        self.check_write()?;
        self.prefs.send_if_modified(|map| {
            if map.get(name) == Some(&value) {
                return false;
            }
            Arc::make_mut(map).insert(name.to_string(), value);
            true
        });
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.check_write()?;
        self.prefs.send_if_modified(|map| {
            if map.is_empty() {
                return false;
            }
            *map = Arc::new(PrefMap::new());
            true
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{keys, SortOrder};

    use crate::traits::PreferenceStoreExt;

    fn alien() -> Record {
        Record::new("Alien", "Ridley Scott", 1979, "Horror").score(8.5)
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        let id = store.insert(&alien()).await.unwrap();
        assert!(id.is_assigned());

        let retrieved = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(retrieved.id, id);
        assert_eq!(retrieved.title, "Alien");
    }

    #[tokio::test]
    async fn test_insert_ignores_caller_id() {
        let store = MemoryStore::new();
        let id = store.insert(&alien().with_id(RecordId::new(99))).await.unwrap();
        assert_eq!(id, RecordId::new(1));
        assert!(store.get_by_id(RecordId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let result = store.update(&alien().with_id(RecordId::new(5))).await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == RecordId::new(5)));
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let store = MemoryStore::new();
        let id = store.insert(&alien()).await.unwrap();
        store.delete_by_id(id).await.unwrap();
        store.delete_by_id(id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_is_live() {
        let store = MemoryStore::new();
        let mut all = store.list_all();
        assert!(all.next().await.unwrap().unwrap().is_empty());

        store.insert(&Record::new("Brazil", "Terry Gilliam", 1985, "Drama")).await.unwrap();
        store.insert(&alien()).await.unwrap();

        let titles: Vec<_> = all
            .next()
            .await
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Alien", "Brazil"]);
    }

    #[tokio::test]
    async fn test_favorites_and_search_queries() {
        let store = MemoryStore::new();
        let id = store.insert(&alien()).await.unwrap();
        store.insert(&Record::new("Amélie", "Jean-Pierre Jeunet", 2001, "Romance")).await.unwrap();

        let mut favorites = store.list_favorites();
        assert!(favorites.next().await.unwrap().unwrap().is_empty());

        store.set_favorite(id, true).await.unwrap();
        let favs = favorites.next().await.unwrap().unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].id, id);

        let mut search = store.search("JEUNET");
        let found = search.next().await.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Amélie");

        let mut everything = store.search("");
        assert_eq!(everything.next().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscriber_count_tracks_drops() {
        let store = MemoryStore::new();
        let all = store.list_all();
        let sort = store.observe(keys::SORT_ORDER);
        assert_eq!(store.subscriber_count(), 2);

        drop(all);
        drop(sort);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_read_failure() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        let mut all = store.list_all();
        assert!(matches!(all.next().await, Some(Err(StoreError::TransientRead(_)))));
    }

    #[tokio::test]
    async fn test_preferences_observe_and_clear() {
        let store = MemoryStore::new();
        let mut sort = store.observe(keys::SORT_ORDER);
        assert_eq!(sort.next().await, Some(SortOrder::Title));

        store.set(keys::SORT_ORDER, SortOrder::RatingDesc).await.unwrap();
        assert_eq!(sort.next().await, Some(SortOrder::RatingDesc));

        store.clear_all().await.unwrap();
        assert_eq!(sort.next().await, Some(SortOrder::Title));
    }

    #[tokio::test]
    async fn test_rapid_writes_last_wins() {
        let store = MemoryStore::new();
        let mut sort = store.observe(keys::SORT_ORDER);
        sort.next().await;

        for order in [SortOrder::YearDesc, SortOrder::RatingDesc, SortOrder::CompletionDesc] {
            store.set(keys::SORT_ORDER, order).await.unwrap();
        }

        assert_eq!(sort.next().await, Some(SortOrder::CompletionDesc));
        assert_eq!(store.current(keys::SORT_ORDER), SortOrder::CompletionDesc);
    }

    #[tokio::test]
    async fn test_non_finite_score_rejected() {
        let store = MemoryStore::new();
        let result = store.insert(&alien().score(f32::NAN)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        let id = store.insert(&alien()).await.unwrap();
        let result = store.update(&alien().with_id(id).score(f32::INFINITY)).await;
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(store.get_by_id(id).await.unwrap().unwrap().score, 8.5);
    }

    #[tokio::test]
    async fn test_injected_record_write_failure() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let err = store.insert(&alien()).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(err.to_string(), "write failed: injected write failure");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_injected_write_failure_leaves_value() {
        let store = MemoryStore::new();
        store.set(keys::FAVORITES_ONLY, true).await.unwrap();

        store.set_fail_writes(true);
        let result = store.set(keys::FAVORITES_ONLY, false).await;
        assert!(matches!(result, Err(StoreError::Write(_))));
        assert!(store.current(keys::FAVORITES_ONLY));
    }
}
