//! Process-wide registry of active item ids.
//!
//! Playback-adjacent code marks ids active or clears them; every change is
//! broadcast as an immutable snapshot to callback subscribers and to
//! [`tokio::sync::watch`] receivers. A panicking subscriber is logged and
//! skipped; the others still receive the snapshot.
//!
//! Callbacks see snapshots in mutation order. One caller at a time drains
//! the pending snapshots; concurrent or reentrant mutations queue theirs
//! behind it and return without waiting.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Immutable view of the active ids.
pub type ActiveSnapshot = Arc<BTreeSet<String>>;

type Subscriber = Arc<dyn Fn(&ActiveSnapshot) + Send + Sync>;

/// Handle returned by [`ActiveSet::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner {
    ids: BTreeSet<String>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    /// Snapshots not yet handed to callbacks, oldest first.
    pending: VecDeque<ActiveSnapshot>,
    /// Set while some caller is draining `pending`.
    dispatching: bool,
}

/// Set of active ids with change notifications.
pub struct ActiveSet {
    inner: Mutex<Inner>,
    watch_tx: watch::Sender<ActiveSnapshot>,
}

static GLOBAL: Lazy<ActiveSet> = Lazy::new(ActiveSet::new);

impl ActiveSet {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(Arc::new(BTreeSet::new()));
        Self {
            inner: Mutex::new(Inner {
                ids: BTreeSet::new(),
                subscribers: Vec::new(),
                next_subscription: 0,
                pending: VecDeque::new(),
                dispatching: false,
            }),
            watch_tx,
        }
    }

    /// The process-wide instance.
    pub fn global() -> &'static ActiveSet {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `mutate` and broadcasts if the set changed.
    fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut BTreeSet<String>) -> bool,
    {
        {
            let mut inner = self.lock();
            if !mutate(&mut inner.ids) {
                return false;
            }
            let snapshot: ActiveSnapshot = Arc::new(inner.ids.clone());
            self.watch_tx.send_replace(snapshot.clone());
            debug!("Active set changed: {} ids", snapshot.len());
            inner.pending.push_back(snapshot);
            if inner.dispatching {
                return true;
            }
            inner.dispatching = true;
        }

        self.dispatch();
        true
    }

    /// Hands pending snapshots to subscribers until none are left.
    fn dispatch(&self) {
        loop {
            let (snapshot, subscribers) = {
                let mut inner = self.lock();
                let Some(snapshot) = inner.pending.pop_front() else {
                    inner.dispatching = false;
                    return;
                };
                let subscribers: Vec<Subscriber> =
                    inner.subscribers.iter().map(|(_, s)| s.clone()).collect();
                (snapshot, subscribers)
            };

            for subscriber in subscribers {
                if catch_unwind(AssertUnwindSafe(|| subscriber(&snapshot))).is_err() {
                    warn!("Active set subscriber panicked; continuing with the rest");
                }
            }
        }
    }

    /// Marks `id` active. Returns `false` if it already was.
    pub fn request_active(&self, id: &str) -> bool {
        self.update(|ids| ids.insert(id.to_string()))
    }

    /// Clears a single id. Returns `false` if it was not active.
    pub fn clear_active(&self, id: &str) -> bool {
        self.update(|ids| ids.remove(id))
    }

    /// Clears every id. Returns `false` if the set was already empty.
    pub fn clear_all(&self) -> bool {
        self.update(|ids| {
            let changed = !ids.is_empty();
            ids.clear();
            changed
        })
    }

    /// Whether `id` is active.
    pub fn is_active(&self, id: &str) -> bool {
        self.lock().ids.contains(id)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ActiveSnapshot {
        self.watch_tx.borrow().clone()
    }

    /// Registers a callback invoked with every new snapshot.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ActiveSnapshot) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns `false` for unknown handles.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(id, _)| *id != subscription);
        inner.subscribers.len() != before
    }

    /// Receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<ActiveSnapshot> {
        self.watch_tx.subscribe()
    }
}

impl Default for ActiveSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_request_and_clear() {
        let set = ActiveSet::new();
        assert!(set.request_active("a"));
        assert!(!set.request_active("a"));
        assert!(set.request_active("b"));
        assert!(set.is_active("a"));

        assert!(set.clear_active("a"));
        assert!(!set.clear_active("a"));
        assert_eq!(set.snapshot().len(), 1);

        assert!(set.clear_all());
        assert!(!set.clear_all());
        assert!(set.snapshot().is_empty());
    }

    #[test]
    fn test_subscribers_receive_snapshots_only_on_change() {
        let set = ActiveSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        set.subscribe(move |snap| sink.lock().unwrap().push(snap.len()));

        set.request_active("a");
        set.request_active("a");
        set.request_active("b");
        set.clear_all();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let set = ActiveSet::new();
        let calls = Arc::new(AtomicUsize::new(0));

        set.subscribe(|_| panic!("subscriber failure"));
        let counter = calls.clone();
        set.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(set.request_active("a"));
        assert!(set.request_active("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(set.is_active("b"));
    }

    #[test]
    fn test_concurrent_mutations_deliver_in_order() {
        let set = Arc::new(ActiveSet::new());
        let seen = Arc::new(Mutex::new(Vec::<ActiveSnapshot>::new()));
        let sink = seen.clone();
        set.subscribe(move |snap| {
            // Widen the window between taking a snapshot and delivering it
            std::thread::yield_now();
            sink.lock().unwrap().push(snap.clone());
        });

        let changes = Arc::new(AtomicUsize::new(0));
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let set = set.clone();
                let changes = changes.clone();
                std::thread::spawn(move || {
                    for round in 0..200 {
                        let id = format!("w{}-{}", worker, round % 5);
                        let changed = if round % 2 == 0 {
                            set.request_active(&id)
                        } else {
                            set.clear_active(&id)
                        };
                        if changed {
                            changes.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), changes.load(Ordering::SeqCst));
        // Every delivered snapshot differs from the previous by exactly one id
        let mut previous: &BTreeSet<String> = &BTreeSet::new();
        for snap in seen.iter() {
            assert_eq!(previous.symmetric_difference(snap).count(), 1);
            previous = &**snap;
        }
        assert_eq!(**seen.last().unwrap(), *set.snapshot());
    }

    #[test]
    fn test_subscriber_may_mutate_the_set() {
        let set = Arc::new(ActiveSet::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_set = Arc::downgrade(&set);
        set.subscribe(move |snap| {
            if snap.contains("trigger") {
                if let Some(set) = inner_set.upgrade() {
                    set.clear_active("trigger");
                }
            }
        });
        let sink = seen.clone();
        set.subscribe(move |snap| sink.lock().unwrap().push(snap.len()));

        set.request_active("trigger");

        assert!(!set.is_active("trigger"));
        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_unsubscribe() {
        let set = ActiveSet::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = set.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        set.request_active("a");
        assert!(set.unsubscribe(handle));
        assert!(!set.unsubscribe(handle));
        set.request_active("b");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_receiver() {
        let set = ActiveSet::new();
        let mut rx = set.watch();
        assert!(rx.borrow().is_empty());

        set.request_active("video-1");
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().contains("video-1"));
    }

    #[test]
    fn test_global_is_shared() {
        let id = "global-test-id";
        ActiveSet::global().request_active(id);
        assert!(ActiveSet::global().is_active(id));
        ActiveSet::global().clear_active(id);
        assert!(!ActiveSet::global().is_active(id));
    }
}
