//! Internal storage implementation for the cache.
//!
//! Stored entries and the registry of running loads live behind one mutex.
//! The lock is only held for bookkeeping; loaders never run under it.
//!
//! Entries are kept in an `IndexMap` ordered by the time they were stored: a
//! reloaded entry is moved to the back, so the purge sweep can stop at the
//! first entry that is still inside the purge horizon.

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::entry::Entry;
use crate::stats::CacheStats;

/// Handle on the outcome of a running load, shared by every waiter.
pub(crate) type Slot<V, E> = Shared<oneshot::Receiver<Result<V, E>>>;

/// What a lookup found under the lock.
pub(crate) enum Access<V, E> {
    /// A fresh entry; the outcome is cloned out of the store.
    Fresh(Result<V, E>),
    /// A load for the key is already running.
    Pending(Slot<V, E>),
    /// No fresh entry and no running load: the caller must start the load and
    /// publish its outcome through `sender`.
    Claimed {
        sender: oneshot::Sender<Result<V, E>>,
        slot: Slot<V, E>,
    },
}

struct State<V, E> {
    entries: IndexMap<String, Entry<V, E>>,
    in_flight: HashMap<String, Slot<V, E>>,
}

/// Thread-safe store of entries and in-flight loads.
///
/// This is the internal implementation; users should use `CoalescingCache`
/// instead.
pub(crate) struct Store<V, E> {
    state: Mutex<State<V, E>>,

    /// Configuration for this cache instance.
    config: CacheConfig,

    /// Statistics for cache operations.
    stats: Arc<CacheStats>,
}

impl<V, E> Store<V, E> {
    /// Create an empty store with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(State {
                entries: IndexMap::new(),
                in_flight: HashMap::new(),
            }),
            config,
            stats: Arc::new(CacheStats::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Finish a load: store its outcome and retire its in-flight slot.
    ///
    /// Publishing to waiters is left to the caller, after the lock is gone.
    pub fn complete(&self, key: &str, outcome: Result<V, E>) {
        if outcome.is_err() {
            self.stats.record_load_error();
        }

        let mut state = self.state.lock();
        let now = Instant::now();
        state.in_flight.remove(key);
        state.entries.shift_remove(key);
        state
            .entries
            .insert(key.to_owned(), Entry::new(outcome, now));
        self.stats.set_size(state.entries.len() as u64);
    }

    /// Retire the in-flight slot of a load that will never publish.
    ///
    /// Any entry stored for the key by an earlier load is left alone.
    pub fn abandon(&self, key: &str) {
        self.state.lock().in_flight.remove(key);
        self.stats.record_load_abort();
    }

    /// Remove every entry older than the purge horizon, except entries whose
    /// key has a load in flight.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let purge = self.config.get_purge_interval();

        let mut guard = self.state.lock();
        let now = Instant::now();
        let State { entries, in_flight } = &mut *guard;

        let horizon = entries
            .values()
            .take_while(|entry| entry.is_purgeable_at(now, purge))
            .count();
        if horizon == 0 {
            return 0;
        }

        let before = entries.len();
        let mut index = 0;
        entries.retain(|key, _| {
            let keep = index >= horizon || in_flight.contains_key(key);
            index += 1;
            keep
        });

        let removed = before - entries.len();
        self.stats.record_purged(removed as u64);
        self.stats.set_size(entries.len() as u64);
        removed
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an entry is stored for `key`, fresh or stale.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Number of loads currently running.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}

impl<V, E> Store<V, E>
where
    V: Clone,
    E: Clone,
{
    /// Decide, under the lock, how a lookup for `key` is served.
    ///
    /// A fresh entry wins; otherwise a running load is joined; otherwise a
    /// new in-flight slot is registered and handed to the caller.
    pub fn access(&self, key: &str) -> Access<V, E> {
        let mut state = self.state.lock();
        let now = Instant::now();

        if let Some(entry) = state.entries.get(key) {
            if entry.is_fresh_at(now, self.config.get_fresh_duration()) {
                self.stats.record_hit();
                return Access::Fresh(entry.outcome().clone());
            }
        }

        if let Some(slot) = state.in_flight.get(key) {
            self.stats.record_coalesced();
            return Access::Pending(slot.clone());
        }

        let (sender, receiver) = oneshot::channel();
        let slot = receiver.shared();
        state.in_flight.insert(key.to_owned(), slot.clone());
        self.stats.record_miss();
        Access::Claimed { sender, slot }
    }
}
