use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::debug;

enum State<V> {
    Running,
    Done(V),
    Abandoned,
}

struct Pending<V> {
    state: Mutex<State<V>>,
    ready: Condvar,
}

impl<V> Pending<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Running),
            ready: Condvar::new(),
        }
    }
}

/// Directory of in-flight computations keyed by request.
///
/// The first caller for a key becomes the leader and runs the job; callers arriving while it
/// runs wait for and clone the leader's value. The entry is dropped when the leader finishes,
/// so later requests compute afresh.
pub struct Coalescer<K, V> {
    in_flight: Mutex<FxHashMap<K, Arc<Pending<V>>>>,
    joined: AtomicU64,
}

/// Publishes the leader's result, or marks the entry abandoned if the job unwound.
struct LeaderGuard<'a, K: Eq + Hash, V> {
    owner: &'a Coalescer<K, V>,
    key: Option<K>,
    pending: Arc<Pending<V>>,
}

impl<K: Eq + Hash, V> LeaderGuard<'_, K, V> {
    fn publish(mut self, value: V) {
        self.settle(State::Done(value));
    }

    fn settle(&mut self, state: State<V>) {
        if let Some(key) = self.key.take() {
            self.owner.in_flight.lock().remove(&key);
            *self.pending.state.lock() = state;
            self.pending.ready.notify_all();
        }
    }
}

impl<K: Eq + Hash, V> Drop for LeaderGuard<'_, K, V> {
    fn drop(&mut self) {
        self.settle(State::Abandoned);
    }
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(FxHashMap::default()),
            joined: AtomicU64::new(0),
        }
    }

    /// Runs `job` for `key`, or waits for the identical run already in progress.
    ///
    /// If the leader's job panics, waiting callers fall back to running `job` themselves.
    pub fn run(&self, key: K, job: impl FnOnce() -> V) -> V {
        let (pending, leader) = {
            let mut map = self.in_flight.lock();
            match map.get(&key) {
                Some(pending) => (Arc::clone(pending), false),
                None => {
                    let pending = Arc::new(Pending::new());
                    map.insert(key.clone(), Arc::clone(&pending));
                    (pending, true)
                }
            }
        };

        if leader {
            let guard = LeaderGuard {
                owner: self,
                key: Some(key),
                pending,
            };
            let value = job();
            guard.publish(value.clone());
            return value;
        }

        self.joined.fetch_add(1, Ordering::Relaxed);
        debug!("coalesce.join");
        let mut state = pending.state.lock();
        loop {
            if let State::Done(value) = &*state {
                return value.clone();
            }
            if matches!(*state, State::Abandoned) {
                break;
            }
            pending.ready.wait(&mut state);
        }
        drop(state);
        job()
    }

    /// Number of calls that reused another caller's computation.
    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }

    /// Number of distinct keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl<K, V> Default for Coalescer<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
