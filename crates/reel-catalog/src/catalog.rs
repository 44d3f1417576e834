//! The Catalog: mutation façade and entry point of the reactive view.
//!
//! Every mutation is fire-and-forget. It is queued on the FIFO lane of its
//! target (records or preferences) and returns a [`Pending`] handle the caller
//! may await or drop. Failures are logged, broadcast on
//! [`Catalog::failures`] and resolved into the handle; they never alter the
//! view state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Datelike;
use tokio::sync::{broadcast, mpsc, oneshot};

use reel_core::{
    keys, validate_record, PrefKey, PrefValue, Record, RecordId, SortOrder, ThemeMode,
};
use reel_store::{PrefWatch, PreferenceStore, PreferenceStoreExt, RecordStore};

use crate::engine::{Engine, ViewSubscription};
use crate::error::{CatalogError, MutationFailure, Operation, Result};
use crate::param::ParamChannel;

/// Failures buffered per `failures()` receiver before it starts lagging.
const FAILURE_BUFFER: usize = 64;

/// Configuration for the Catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// How long the view engine keeps its upstream subscriptions after the
    /// last subscriber left.
    pub linger: Duration,
    /// Re-run a failed collection query after this long, even without a new
    /// store change. `None` waits for the next change.
    pub read_retry: Option<Duration>,
    /// Whether to validate records before insert and update.
    pub validate_on_write: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            linger: Duration::from_secs(5),
            read_retry: Some(Duration::from_secs(2)),
            validate_on_write: true,
        }
    }
}

/// The main Catalog struct.
///
/// Provides a unified API for:
/// - Observing the composed view ([`view`](Catalog::view))
/// - Changing view parameters (search, favorites-only, sort order)
/// - Mutating records
/// - Session and theme preferences
pub struct Catalog<S, P> {
    records: Arc<S>,
    prefs: Arc<P>,
    search: Arc<ParamChannel<String>>,
    engine: Engine<S, P>,
    record_lane: Lane,
    pref_lane: Lane,
    failures: broadcast::Sender<MutationFailure>,
    config: CatalogConfig,
}

impl<T> Catalog<T, T>
where
    T: RecordStore + PreferenceStore + 'static,
{
    /// Build a catalog over a single store serving both records and
    /// preferences (e.g. one SQLite file).
    pub fn with_store(store: Arc<T>, config: CatalogConfig) -> Self {
        Self::new(Arc::clone(&store), store, config)
    }
}

impl<S, P> Catalog<S, P>
where
    S: RecordStore + 'static,
    P: PreferenceStore + 'static,
{
    /// Create a new catalog. Must be called from within a tokio runtime.
    pub fn new(records: Arc<S>, prefs: Arc<P>, config: CatalogConfig) -> Self {
        let search = Arc::new(ParamChannel::new(String::new()));
        let engine = Engine::new(
            Arc::clone(&records),
            Arc::clone(&prefs),
            Arc::clone(&search),
            &config,
        );
        let (failures, _) = broadcast::channel(FAILURE_BUFFER);

        Self {
            records,
            prefs,
            search,
            engine,
            record_lane: Lane::spawn("records"),
            pref_lane: Lane::spawn("preferences"),
            failures,
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine<S, P> {
        &self.engine
    }

    pub fn record_store(&self) -> &S {
        &self.records
    }

    pub fn preference_store(&self) -> &P {
        &self.prefs
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to the composed view.
    pub fn view(&self) -> ViewSubscription {
        self.engine.subscribe()
    }

    /// Out-of-band stream of failed mutations.
    pub fn failures(&self) -> broadcast::Receiver<MutationFailure> {
        self.failures.subscribe()
    }

    /// Observe any preference key, e.g. [`keys::THEME_MODE`] or
    /// [`keys::IS_SESSION_ACTIVE`].
    pub fn observe<T: PrefValue>(&self, key: PrefKey<T>) -> PrefWatch<T> {
        self.prefs.observe(key)
    }

    /// Read one record.
    pub async fn get(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.records.get_by_id(id).await?)
    }

    /// Wait until every mutation queued so far has run.
    pub async fn flush(&self) {
        let records = self.record_lane.barrier();
        let prefs = self.pref_lane.barrier();
        let _ = records.await;
        let _ = prefs.await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // View Parameters
    // ─────────────────────────────────────────────────────────────────────────

    /// Update the live search text. Takes effect immediately; not persisted.
    pub fn set_search_text(&self, text: impl Into<String>) {
        self.search.set(text.into());
    }

    pub fn search_text(&self) -> String {
        self.search.get()
    }

    pub fn set_favorites_only(&self, favorites_only: bool) -> Pending<()> {
        let prefs = Arc::clone(&self.prefs);
        self.pref_lane
            .enqueue(Operation::SetFavoritesOnly, &self.failures, async move {
                Ok(prefs.set(keys::FAVORITES_ONLY, favorites_only).await?)
            })
    }

    /// Flip the persisted favorites-only flag.
    ///
    /// The current value is read when the write runs, so queued toggles
    /// compose.
    pub fn toggle_favorites_filter(&self) -> Pending<()> {
        let prefs = Arc::clone(&self.prefs);
        self.pref_lane
            .enqueue(Operation::ToggleFavoritesFilter, &self.failures, async move {
                let current = prefs.current(keys::FAVORITES_ONLY);
                Ok(prefs.set(keys::FAVORITES_ONLY, !current).await?)
            })
    }

    pub fn set_sort_order(&self, order: SortOrder) -> Pending<()> {
        let prefs = Arc::clone(&self.prefs);
        self.pref_lane
            .enqueue(Operation::SetSortOrder, &self.failures, async move {
                Ok(prefs.set(keys::SORT_ORDER, order).await?)
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session & Appearance
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_theme(&self, mode: ThemeMode) -> Pending<()> {
        let prefs = Arc::clone(&self.prefs);
        self.pref_lane
            .enqueue(Operation::SetTheme, &self.failures, async move {
                Ok(prefs.set(keys::THEME_MODE, mode).await?)
            })
    }

    /// Mark the local session active under `display_name`. Cosmetic only.
    pub fn start_session(&self, display_name: impl Into<String>) -> Pending<()> {
        let prefs = Arc::clone(&self.prefs);
        let display_name = display_name.into();
        self.pref_lane
            .enqueue(Operation::StartSession, &self.failures, async move {
                prefs.set(keys::IS_SESSION_ACTIVE, true).await?;
                Ok(prefs.set(keys::DISPLAY_NAME, display_name).await?)
            })
    }

    /// End the session: every preference goes back to its default.
    pub fn end_session(&self) -> Pending<()> {
        let prefs = Arc::clone(&self.prefs);
        self.pref_lane
            .enqueue(Operation::EndSession, &self.failures, async move {
                Ok(prefs.clear_all().await?)
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a record. The store assigns the id.
    pub fn insert(&self, record: Record) -> Pending<RecordId> {
        let store = Arc::clone(&self.records);
        let validate = self.config.validate_on_write;
        self.record_lane
            .enqueue(Operation::Insert, &self.failures, async move {
                if validate {
                    validate_record(&record, current_year())?;
                }
                Ok(store.insert(&record).await?)
            })
    }

    /// Replace an existing record.
    pub fn update(&self, record: Record) -> Pending<()> {
        let store = Arc::clone(&self.records);
        let validate = self.config.validate_on_write;
        self.record_lane
            .enqueue(Operation::Update, &self.failures, async move {
                if validate {
                    validate_record(&record, current_year())?;
                }
                Ok(store.update(&record).await?)
            })
    }

    pub fn delete(&self, record: &Record) -> Pending<()> {
        self.delete_by_id(record.id)
    }

    pub fn delete_by_id(&self, id: RecordId) -> Pending<()> {
        let store = Arc::clone(&self.records);
        self.record_lane
            .enqueue(Operation::Delete, &self.failures, async move {
                Ok(store.delete_by_id(id).await?)
            })
    }

    /// Write `!current` as the record's favorite flag.
    ///
    /// `current` is what the caller last saw; the store is not re-read, so two
    /// toggles issued from the same stale value both write the same result.
    pub fn toggle_favorite(&self, id: RecordId, current: bool) -> Pending<()> {
        let store = Arc::clone(&self.records);
        self.record_lane
            .enqueue(Operation::ToggleFavorite, &self.failures, async move {
                Ok(store.set_favorite(id, !current).await?)
            })
    }

    /// Set (or clear, with `None`) the completion timestamp in epoch millis.
    pub fn mark_completed(&self, id: RecordId, at: Option<i64>) -> Pending<()> {
        let store = Arc::clone(&self.records);
        self.record_lane
            .enqueue(Operation::MarkCompleted, &self.failures, async move {
                Ok(store.set_completed_at(id, at).await?)
            })
    }

    /// Mark a record completed at the current wall-clock time.
    pub fn mark_completed_now(&self, id: RecordId) -> Pending<()> {
        self.mark_completed(id, Some(now_millis()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Write Lanes
// ─────────────────────────────────────────────────────────────────────────────

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A FIFO queue of writes executed one at a time by its own task.
struct Lane {
    tx: mpsc::UnboundedSender<Job>,
}

impl Lane {
    fn spawn(name: &'static str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            tracing::debug!(lane = name, "write lane closed");
        });
        Self { tx }
    }

    fn enqueue<T, F>(
        &self,
        operation: Operation,
        failures: &broadcast::Sender<MutationFailure>,
        work: F,
    ) -> Pending<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        let failures = failures.clone();
        let job: Job = Box::pin(async move {
            let result = work.await;
            if let Err(e) = &result {
                let failure = MutationFailure::new(operation, e);
                tracing::warn!(%operation, kind = ?failure.kind, error = %e, "mutation failed");
                // No receivers is fine: the failure is already logged.
                let _ = failures.send(failure);
            }
            let _ = done.send(result);
        });

        // A closed lane drops the job, which resolves the handle as Closed.
        let _ = self.tx.send(job);
        Pending { rx }
    }

    /// Resolves once every job queued before it has run.
    fn barrier(&self) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        let _ = self.tx.send(Box::pin(async move {
            let _ = done.send(());
        }));
        rx
    }
}

/// Handle on a queued mutation.
///
/// Dropping it does not cancel the write. Awaiting it yields the outcome.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CatalogError::Closed)))
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::ValidationError;
    use reel_store::{MemoryStore, StoreError};

    use crate::error::FailureKind;

    fn catalog() -> Catalog<MemoryStore, MemoryStore> {
        Catalog::with_store(Arc::new(MemoryStore::new()), CatalogConfig::default())
    }

    fn alien() -> Record {
        Record::new("Alien", "Ridley Scott", 1979, "Horror").score(8.5)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let catalog = catalog();
        let id = catalog.insert(alien()).await.unwrap();

        let record = catalog.get(id).await.unwrap().unwrap();
        assert_eq!(record, alien().with_id(id));
    }

    #[tokio::test]
    async fn test_invalid_record_never_reaches_store() {
        let catalog = catalog();
        let mut failures = catalog.failures();

        let result = catalog.insert(Record::new("A", "Ridley Scott", 1979, "Horror")).await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::TitleLength { .. }))
        ));

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.operation, Operation::Insert);
        assert_eq!(failure.kind, FailureKind::Validation);
        assert!(catalog.record_store().is_empty());
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let config = CatalogConfig {
            validate_on_write: false,
            ..CatalogConfig::default()
        };
        let catalog = Catalog::with_store(Arc::new(MemoryStore::new()), config);

        catalog.insert(Record::new("A", "B", 1000, "")).await.unwrap();
        assert_eq!(catalog.record_store().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_reports_not_found() {
        let catalog = catalog();
        let mut failures = catalog.failures();

        let result = catalog.update(alien().with_id(RecordId::new(42))).await;
        assert!(matches!(result, Err(CatalogError::Store(StoreError::NotFound(_)))));

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.operation, Operation::Update);
        assert_eq!(failure.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_dropped_handle_still_writes() {
        let catalog = catalog();
        drop(catalog.insert(alien()));
        drop(catalog.set_sort_order(SortOrder::RatingDesc));

        catalog.flush().await;
        assert_eq!(catalog.record_store().len(), 1);
        assert_eq!(
            catalog.preference_store().current(keys::SORT_ORDER),
            SortOrder::RatingDesc
        );
    }

    #[tokio::test]
    async fn test_toggle_favorites_filter_composes() {
        let catalog = catalog();
        drop(catalog.toggle_favorites_filter());
        drop(catalog.toggle_favorites_filter());
        catalog.toggle_favorites_filter().await.unwrap();

        assert!(catalog.preference_store().current(keys::FAVORITES_ONLY));
    }

    #[tokio::test]
    async fn test_session_start_and_end() {
        let catalog = catalog();
        catalog.start_session("marta").await.unwrap();
        catalog.set_theme(ThemeMode::Dark).await.unwrap();

        let prefs = catalog.preference_store();
        assert!(prefs.current(keys::IS_SESSION_ACTIVE));
        assert_eq!(prefs.current(keys::DISPLAY_NAME), "marta");

        catalog.end_session().await.unwrap();
        assert!(!prefs.current(keys::IS_SESSION_ACTIVE));
        assert_eq!(prefs.current(keys::DISPLAY_NAME), "");
        assert_eq!(prefs.current(keys::THEME_MODE), ThemeMode::System);
    }

    #[tokio::test]
    async fn test_mark_completed_now() {
        let catalog = catalog();
        let id = catalog.insert(alien()).await.unwrap();

        catalog.mark_completed_now(id).await.unwrap();
        let record = catalog.get(id).await.unwrap().unwrap();
        assert!(record.completed_at.unwrap() > 0);

        catalog.mark_completed(id, None).await.unwrap();
        assert!(catalog.get(id).await.unwrap().unwrap().completed_at.is_none());
    }

    #[tokio::test]
    async fn test_search_text_is_synchronous() {
        let catalog = catalog();
        catalog.set_search_text("ali");
        assert_eq!(catalog.search_text(), "ali");
    }
}
