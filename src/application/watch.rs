// src/application/watch.rs
//! Live read streams over the local store.
//!
//! Every write path bumps a generation counter on a shared [`ChangeNotifier`];
//! a [`LiveQuery`] re-runs its query whenever the counter moves. The stream is
//! lazy and restartable: the first `next()` yields the current result set
//! immediately, each later `next()` waits for a store change. Dropping the
//! query cancels it; nothing else is torn down with it.

use tokio::sync::watch;

use crate::application::error::ApplicationResult;

/// Store-change broadcast shared by all services writing to the local store.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Signal that the store changed. Streams with no live receiver are a
    /// no-op, so writers never block on readers.
    pub fn notify(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A restartable, potentially infinite sequence of the current result set of
/// one query.
pub struct LiveQuery<T> {
    rx: watch::Receiver<u64>,
    fetch: Box<dyn Fn() -> ApplicationResult<Vec<T>> + Send + Sync>,
    primed: bool,
}

impl<T> LiveQuery<T> {
    pub fn new(
        notifier: &ChangeNotifier,
        fetch: impl Fn() -> ApplicationResult<Vec<T>> + Send + Sync + 'static,
    ) -> Self {
        let mut rx = notifier.subscribe();
        // Writes between subscribing and the first next() are covered by the
        // initial fetch.
        rx.mark_unchanged();

        Self {
            rx,
            fetch: Box::new(fetch),
            primed: false,
        }
    }

    /// Current result set on the first call; afterwards waits for the next
    /// store change. Returns `None` once every writer is gone.
    pub async fn next(&mut self) -> Option<ApplicationResult<Vec<T>>> {
        if !self.primed {
            self.primed = true;
            return Some((self.fetch)());
        }

        self.rx.changed().await.ok()?;
        Some((self.fetch)())
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("primed", &self.primed)
            .finish()
    }
}
