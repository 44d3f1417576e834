//! Live query primitives.
//!
//! Stores publish a change revision on a `tokio::sync::watch` channel after
//! every successful mutation. A [`LiveQuery`] pairs a receiver of that
//! channel with a re-query closure: it yields the current result right away
//! and a fresh one after each observed change. Because `watch` keeps only the
//! latest revision, a burst of writes collapses into a single re-query that
//! still reflects the final state.
//!
//! [`PrefWatch`] is the preference-side equivalent: a typed view over the
//! store's preference map channel that emits each distinct value of one key.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use reel_core::{PrefKey, PrefMap, PrefValue};

use crate::error::Result;

/// Boxed future returned by a query closure.
pub type QueryFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Re-runnable query.
pub type QueryFn<T> = Arc<dyn Fn() -> QueryFuture<T> + Send + Sync>;

/// A query that re-emits its full result after every relevant store change.
///
/// Dropping the `LiveQuery` cancels the subscription.
pub struct LiveQuery<T> {
    changes: watch::Receiver<u64>,
    query: QueryFn<T>,
    /// A change was observed (or nothing was emitted yet) and no result has
    /// been delivered for it.
    dirty: bool,
    retry: Option<Duration>,
    retry_at: Option<Instant>,
}

impl<T> LiveQuery<T> {
    /// Build a live query from a store's change channel and a query closure.
    pub fn new(mut changes: watch::Receiver<u64>, query: QueryFn<T>) -> Self {
        changes.borrow_and_update();
        Self {
            changes,
            query,
            dirty: true,
            retry: None,
            retry_at: None,
        }
    }

    /// Re-run a failed query after `interval` even if the store doesn't change.
    ///
    /// Without this, a failed query is only retried on the next change.
    pub fn with_retry(mut self, interval: Duration) -> Self {
        self.retry = Some(interval);
        self
    }

    /// Wait for the next result.
    ///
    /// The first call resolves immediately with the current result. Later
    /// calls wait for a change. Returns `None` once the store is gone.
    ///
    /// Cancel-safe: if the future is dropped after a change was observed but
    /// before the query finished, the next call re-runs the query without
    /// waiting.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if !self.dirty {
            self.changes.changed().await.ok()?;
            self.changes.borrow_and_update();
            self.dirty = true;
        } else if let Some(at) = self.retry_at {
            tokio::select! {
                _ = tokio::time::sleep_until(at) => {}
                changed = self.changes.changed() => {
                    changed.ok()?;
                    self.changes.borrow_and_update();
                }
            }
        }

        let result = (self.query)().await;
        match &result {
            Ok(_) => {
                self.dirty = false;
                self.retry_at = None;
            }
            Err(_) => {
                // Stay dirty: a change observed while failing must not be lost.
                self.dirty = self.retry.is_some();
                self.retry_at = self.retry.map(|interval| Instant::now() + interval);
            }
        }
        Some(result)
    }

    /// Current store revision as last observed by this query.
    pub fn revision(&self) -> u64 {
        *self.changes.borrow()
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("revision", &self.revision())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Observes a single preference key.
///
/// Emits the current value on the first [`next`](PrefWatch::next) call and
/// then every distinct new value of that key. Writes to other keys are
/// filtered out.
pub struct PrefWatch<T: PrefValue> {
    map: watch::Receiver<Arc<PrefMap>>,
    key: PrefKey<T>,
    last: Option<T>,
}

impl<T: PrefValue> PrefWatch<T> {
    pub fn new(map: watch::Receiver<Arc<PrefMap>>, key: PrefKey<T>) -> Self {
        Self {
            map,
            key,
            last: None,
        }
    }

    /// The key being observed.
    pub fn key(&self) -> PrefKey<T> {
        self.key
    }

    /// Read the current value without waiting.
    pub fn current(&self) -> T {
        self.key.read(&self.map.borrow())
    }

    /// Wait for the next distinct value. Returns `None` once the store is gone.
    ///
    /// Cancel-safe: all state is updated synchronously after `changed()`.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if self.last.is_some() {
                self.map.changed().await.ok()?;
            }
            let value = self.key.read(&self.map.borrow_and_update());
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
        }
    }
}

impl<T: PrefValue> std::fmt::Debug for PrefWatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefWatch")
            .field("key", &self.key)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use reel_core::{keys, SortOrder};

    use crate::error::StoreError;

    fn counting_query(calls: Arc<AtomicUsize>) -> QueryFn<usize> {
        Arc::new(move || -> QueryFuture<usize> {
            let calls = calls.clone();
            Box::pin(async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) })
        })
    }

    #[tokio::test]
    async fn test_first_next_is_immediate() {
        let (tx, rx) = watch::channel(0u64);
        let calls = Arc::new(AtomicUsize::new(0));
        let mut live = LiveQuery::new(rx, counting_query(calls.clone()));

        assert_eq!(live.next().await.unwrap().unwrap(), 1);
        drop(tx);
        assert!(live.next().await.is_none());
    }

    #[tokio::test]
    async fn test_burst_coalesces() {
        let (tx, rx) = watch::channel(0u64);
        let calls = Arc::new(AtomicUsize::new(0));
        let mut live = LiveQuery::new(rx, counting_query(calls.clone()));
        live.next().await.unwrap().unwrap();

        for _ in 0..10 {
            tx.send_modify(|rev| *rev += 1);
        }

        assert_eq!(live.next().await.unwrap().unwrap(), 2);
        assert_eq!(live.revision(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_next_does_not_lose_change() {
        let (tx, rx) = watch::channel(0u64);
        let calls = Arc::new(AtomicUsize::new(0));
        let slow: QueryFn<usize> = {
            let calls = calls.clone();
            Arc::new(move || -> QueryFuture<usize> {
                let calls = calls.clone();
                Box::pin(async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 1 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok(n)
                })
            })
        };
        let mut live = LiveQuery::new(rx, slow);
        live.next().await.unwrap().unwrap();

        tx.send_modify(|rev| *rev += 1);
        // Observes the change, then gets cancelled mid-query.
        let cancelled = tokio::time::timeout(Duration::from_millis(20), live.next()).await;
        assert!(cancelled.is_err());

        // No new change: the pending one must still be delivered.
        let value = tokio::time::timeout(Duration::from_secs(1), live.next())
            .await
            .expect("pending change re-queried")
            .unwrap()
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_failure() {
        let (_tx, rx) = watch::channel(0u64);
        let calls = Arc::new(AtomicUsize::new(0));
        let flaky: QueryFn<usize> = {
            let calls = calls.clone();
            Arc::new(move || -> QueryFuture<usize> {
                let calls = calls.clone();
                Box::pin(async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(StoreError::TransientRead("disk hiccup".into())),
                        n => Ok(n),
                    }
                })
            })
        };
        let mut live = LiveQuery::new(rx, flaky).with_retry(Duration::from_millis(100));

        assert!(matches!(live.next().await, Some(Err(StoreError::TransientRead(_)))));
        assert_eq!(live.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pref_watch_filters_other_keys() {
        let (tx, rx) = watch::channel(Arc::new(PrefMap::new()));
        let mut sort = PrefWatch::new(rx, keys::SORT_ORDER);

        assert_eq!(sort.next().await, Some(SortOrder::Title));

        tx.send_modify(|map| {
            Arc::make_mut(map).insert("favoritesOnly".into(), serde_json::json!(true));
        });
        tx.send_modify(|map| {
            Arc::make_mut(map).insert("sortOrder".into(), serde_json::json!("year"));
        });

        assert_eq!(sort.next().await, Some(SortOrder::YearDesc));
        assert_eq!(sort.current(), SortOrder::YearDesc);
    }
}
