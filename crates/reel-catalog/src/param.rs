//! Parameter channels: in-memory, observable input cells.

use tokio::sync::watch;

/// A single observable value held in memory.
///
/// `set` never blocks and only notifies subscribers when the value actually
/// changes. Subscribers always see the latest value; intermediate values of a
/// burst may be skipped.
#[derive(Debug)]
pub struct ParamChannel<T> {
    tx: watch::Sender<T>,
}

impl<T> ParamChannel<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the value. Returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Subscribe to changes. The current value counts as already seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T> Default for ParamChannel<T>
where
    T: Clone + PartialEq + Send + Sync + Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}
