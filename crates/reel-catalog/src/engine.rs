//! The composition engine: one continuously up-to-date view of the catalog.
//!
//! A single task owns the four input cells (collection, favorites-only flag,
//! sort order, search text). Each upstream event updates exactly one cell and
//! triggers one recomputation; the result is published on a `watch` channel
//! only when it differs from the current snapshot.
//!
//! The task runs while someone is subscribed. When the last
//! [`ViewSubscription`] is dropped it lingers for a grace period, then drops
//! every upstream subscription. The last snapshot stays in the channel and is
//! what the next subscriber sees first.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use reel_core::{keys, Record, SortOrder, ViewParams, ViewState};
use reel_store::{LiveQuery, PrefWatch, PreferenceStore, PreferenceStoreExt, RecordStore};

use crate::catalog::CatalogConfig;
use crate::param::ParamChannel;

/// Reference-counted producer of [`ViewState`] snapshots.
pub struct Engine<S, P> {
    records: Arc<S>,
    prefs: Arc<P>,
    search: Arc<ParamChannel<String>>,
    output: Arc<watch::Sender<ViewState>>,
    registry: Arc<Mutex<Registry>>,
    reattached: Arc<Notify>,
    linger: Duration,
    read_retry: Option<Duration>,
}

#[derive(Debug, Default)]
struct Registry {
    running: bool,
    starts: u64,
    /// Bumped on every subscribe; a change during the grace period restarts it.
    attaches: u64,
}

impl<S, P> Engine<S, P>
where
    S: RecordStore + 'static,
    P: PreferenceStore + 'static,
{
    pub fn new(
        records: Arc<S>,
        prefs: Arc<P>,
        search: Arc<ParamChannel<String>>,
        config: &CatalogConfig,
    ) -> Self {
        let (output, _) = watch::channel(ViewState::loading());
        Self {
            records,
            prefs,
            search,
            output: Arc::new(output),
            registry: Arc::new(Mutex::new(Registry::default())),
            reattached: Arc::new(Notify::new()),
            linger: config.linger,
            read_retry: config.read_retry,
        }
    }

    /// Attach a subscriber, starting the combiner task if it isn't running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> ViewSubscription {
        let mut registry = lock(&self.registry);
        let rx = self.output.subscribe();
        registry.attaches += 1;

        if registry.running {
            self.reattached.notify_one();
        } else {
            registry.running = true;
            registry.starts += 1;
            tracing::debug!(starts = registry.starts, "starting view engine");

            let inputs = self.inputs();
            tokio::spawn(run(
                inputs,
                Arc::clone(&self.output),
                Arc::clone(&self.registry),
                Arc::clone(&self.reattached),
                self.linger,
            ));
        }

        ViewSubscription { rx }
    }

    /// Whether the combiner task currently holds its upstream subscriptions.
    pub fn is_active(&self) -> bool {
        lock(&self.registry).running
    }

    /// How many times the combiner task has been started.
    pub fn starts(&self) -> u64 {
        lock(&self.registry).starts
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> ViewState {
        self.output.borrow().clone()
    }

    fn inputs(&self) -> Inputs {
        let mut records = self.records.list_all();
        if let Some(interval) = self.read_retry {
            records = records.with_retry(interval);
        }
        Inputs {
            records,
            favorites_only: self.prefs.observe(keys::FAVORITES_ONLY),
            sort_order: self.prefs.observe(keys::SORT_ORDER),
            search: self.search.subscribe(),
        }
    }
}

impl<S, P> std::fmt::Debug for Engine<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &*lock(&self.registry))
            .field("linger", &self.linger)
            .finish()
    }
}

/// A handle on the engine's output. Dropping it detaches the subscriber.
#[derive(Debug, Clone)]
pub struct ViewSubscription {
    rx: watch::Receiver<ViewState>,
}

impl ViewSubscription {
    /// The latest snapshot, without waiting.
    pub fn current(&self) -> ViewState {
        self.rx.borrow().clone()
    }

    /// Wait for the next published snapshot. `None` once the engine is gone.
    pub async fn changed(&mut self) -> Option<ViewState> {
        self.rx.changed().await.ok()?;
        let state = self.rx.borrow_and_update().clone();
        Some(state)
    }

    /// Wait until a snapshot satisfies `predicate`, checking the current one
    /// first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&ViewState) -> bool,
    ) -> Option<ViewState> {
        let state = self.rx.wait_for(|state| predicate(state)).await.ok()?.clone();
        Some(state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Combiner Task
// ─────────────────────────────────────────────────────────────────────────────

struct Inputs {
    records: LiveQuery<Vec<Record>>,
    favorites_only: PrefWatch<bool>,
    sort_order: PrefWatch<SortOrder>,
    search: watch::Receiver<String>,
}

/// Latest value of every input. `None` until that input first produced.
#[derive(Debug, Default)]
struct Cells {
    records: Option<Vec<Record>>,
    favorites_only: Option<bool>,
    sort_order: Option<SortOrder>,
    search_text: Option<String>,
    error: Option<String>,
}

impl Cells {
    fn params(&self) -> Option<ViewParams> {
        Some(ViewParams {
            search_text: self.search_text.clone()?,
            favorites_only: self.favorites_only?,
            sort_order: self.sort_order?,
        })
    }

    /// The snapshot these cells describe, falling back to `previous` until
    /// every input has produced.
    fn compose(&self, previous: &ViewState) -> ViewState {
        match (&self.records, self.params()) {
            (Some(records), Some(params)) => {
                let mut state = ViewState::ready(records, &params);
                state.error = self.error.clone();
                state
            }
            _ => {
                let mut state = previous.clone();
                if self.error.is_some() {
                    state.error = self.error.clone();
                }
                state
            }
        }
    }
}

async fn run(
    mut inputs: Inputs,
    output: Arc<watch::Sender<ViewState>>,
    registry: Arc<Mutex<Registry>>,
    reattached: Arc<Notify>,
    linger: Duration,
) {
    let mut cells = Cells {
        search_text: Some(inputs.search.borrow_and_update().clone()),
        ..Cells::default()
    };
    // Grace deadline and the attach count seen when it was armed.
    let mut lingering: Option<(Instant, u64)> = None;

    loop {
        tokio::select! {
            next = inputs.records.next() => match next {
                Some(Ok(records)) => {
                    cells.records = Some(records);
                    cells.error = None;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "collection query failed");
                    cells.error = Some(e.to_string());
                }
                None => break,
            },
            next = inputs.favorites_only.next() => match next {
                Some(value) => cells.favorites_only = Some(value),
                None => break,
            },
            next = inputs.sort_order.next() => match next {
                Some(value) => cells.sort_order = Some(value),
                None => break,
            },
            changed = inputs.search.changed() => match changed {
                Ok(()) => cells.search_text = Some(inputs.search.borrow_and_update().clone()),
                Err(_) => break,
            },
            _ = output.closed(), if lingering.is_none() => {
                let registry = lock(&registry);
                // Subscribers attach under the registry lock, so this count is exact.
                if output.receiver_count() == 0 {
                    lingering = Some((Instant::now() + linger, registry.attaches));
                }
                continue;
            }
            _ = reattached.notified(), if lingering.is_some() => {
                let attaches = lock(&registry).attaches;
                if lingering.map_or(false, |(_, seen)| seen != attaches) {
                    // Back to waiting for the new subscribers to leave.
                    lingering = None;
                }
                continue;
            }
            _ = tokio::time::sleep_until(lingering.map_or_else(Instant::now, |(at, _)| at)), if lingering.is_some() => {
                if retire(&output, &registry) {
                    tracing::debug!("view engine idle, released upstream subscriptions");
                    return;
                }
                lingering = None;
                continue;
            }
        }

        let published = output.send_if_modified(|current| {
            let next = cells.compose(current);
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        tracing::trace!(published, "view recomputed");
    }

    tracing::debug!("view engine input closed, stopping");
    lock(&registry).running = false;
}

/// Mark the task stopped if nobody re-subscribed during the grace period.
fn retire(output: &watch::Sender<ViewState>, registry: &Mutex<Registry>) -> bool {
    let mut registry = lock(registry);
    if output.receiver_count() > 0 {
        return false;
    }
    registry.running = false;
    true
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_store::MemoryStore;

    fn engine(store: &Arc<MemoryStore>) -> (Engine<MemoryStore, MemoryStore>, Arc<ParamChannel<String>>) {
        let search = Arc::new(ParamChannel::new(String::new()));
        let config = CatalogConfig {
            read_retry: None,
            ..CatalogConfig::default()
        };
        let engine = Engine::new(Arc::clone(store), Arc::clone(store), Arc::clone(&search), &config);
        (engine, search)
    }

    #[tokio::test]
    async fn test_empty_collection_goes_ready() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _search) = engine(&store);

        let mut view = engine.subscribe();
        assert!(view.current().loading);

        let ready = view.wait_for(ViewState::is_ready).await.unwrap();
        assert!(ready.records.is_empty());
        assert_eq!(ready.sort_order, SortOrder::Title);
        assert!(ready.error.is_none());
    }

    #[tokio::test]
    async fn test_search_change_recomputes() {
        let store = Arc::new(MemoryStore::new());
        store.insert(&Record::new("Alien", "Ridley Scott", 1979, "Horror")).await.unwrap();
        store.insert(&Record::new("Brazil", "Terry Gilliam", 1985, "Drama")).await.unwrap();
        let (engine, search) = engine(&store);

        let mut view = engine.subscribe();
        view.wait_for(|s| s.records.len() == 2).await.unwrap();

        search.set("  gilliam ".to_string());
        let state = view.wait_for(|s| s.search_text == "  gilliam ").await.unwrap();
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].title, "Brazil");
    }

    #[tokio::test]
    async fn test_read_error_surfaces_and_clears() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_reads(true);
        let (engine, _search) = engine(&store);

        let mut view = engine.subscribe();
        let failed = view.wait_for(|s| s.error.is_some()).await.unwrap();
        assert!(failed.loading);

        store.set_fail_reads(false);
        store.touch();
        let recovered = view.wait_for(ViewState::is_ready).await.unwrap();
        assert!(recovered.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_linger_teardown_and_restart() {
        let store = Arc::new(MemoryStore::new());
        store.insert(&Record::new("Alien", "Ridley Scott", 1979, "Horror")).await.unwrap();
        let (engine, _search) = engine(&store);

        let mut view = engine.subscribe();
        let ready = view.wait_for(ViewState::is_ready).await.unwrap();
        assert!(store.subscriber_count() > 0);
        drop(view);

        // Still inside the grace period.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(engine.is_active());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!engine.is_active());
        assert_eq!(store.subscriber_count(), 0);

        // The next subscriber sees the retained snapshot immediately.
        let view = engine.subscribe();
        assert_eq!(view.current(), ready);
        assert_eq!(engine.starts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_within_grace_keeps_task() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _search) = engine(&store);

        let mut view = engine.subscribe();
        view.wait_for(ViewState::is_ready).await.unwrap();
        drop(view);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let _view = engine.subscribe();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(engine.is_active());
        assert_eq!(engine.starts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_restarts_after_brief_resubscribe() {
        let store = Arc::new(MemoryStore::new());
        let (engine, _search) = engine(&store);

        let mut view = engine.subscribe();
        view.wait_for(ViewState::is_ready).await.unwrap();
        drop(view);

        tokio::time::sleep(Duration::from_millis(4800)).await;
        let view = engine.subscribe();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(view);

        // Past the first deadline, well inside a full grace from the last detach.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(engine.is_active());
        assert_eq!(engine.starts(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!engine.is_active());
        assert_eq!(store.subscriber_count(), 0);
    }
}
