//! The main cache interface.
//!
//! This module provides the `CoalescingCache` type that callers interact
//! with, and the `Lookup` future it hands out.

use futures::channel::oneshot;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::CacheConfig;
use crate::stats::{CacheStats, StatsSnapshot};
use crate::storage::{Access, Slot, Store};

/// A single-flight, time-bounded cache for expensive lookups.
///
/// Concurrent [`get_or_load`](Self::get_or_load) calls for the same key share
/// one loader run, and its outcome (value or error) is served to later calls
/// until it goes stale. Entries older than the purge horizon are swept in the
/// background.
///
/// Cloning a `CoalescingCache` creates a new handle to the same state.
///
/// # Example
/// ```
/// use coalescing_cache::{CacheConfig, CoalescingCache};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = CacheConfig::builder()
///     .fresh_duration(Duration::from_secs(300))
///     .purge_interval(Duration::from_secs(600))
///     .build()
///     .unwrap();
/// let cache: CoalescingCache<String, String> = CoalescingCache::new(config);
///
/// let team = cache
///     .get_or_load("team:abc123", |_key| async { Ok("Acme".to_string()) })
///     .await;
/// assert_eq!(team, Ok("Acme".to_string()));
/// # }
/// ```
pub struct CoalescingCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

struct Inner<V, E> {
    store: Store<V, E>,
    /// Set while a sweep task is alive; cleared by [`SweeperGuard`].
    sweeper_running: Arc<AtomicBool>,
}

impl<V, E> Clone for CoalescingCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> fmt::Debug for CoalescingCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescingCache")
            .field("config", self.config())
            .field("len", &self.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<V, E> CoalescingCache<V, E> {
    /// Create a new cache with the given configuration.
    ///
    /// No background work starts here; the sweep task is spawned by the first
    /// lookup, on the runtime that lookup runs on. If that runtime shuts down,
    /// the next lookup spawns a new sweep task on its own runtime.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Store::new(config),
                sweeper_running: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        self.inner.store.config()
    }

    /// Number of stored entries.
    ///
    /// Note: this includes stale entries that have not been purged or
    /// reloaded yet.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Check if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Check if an entry (fresh or stale) is stored for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.store.contains(key)
    }

    /// Number of loads currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.store.in_flight()
    }

    /// Remove entries older than the purge horizon now.
    ///
    /// Entries whose key has a load in flight are kept. Returns the number
    /// of entries removed.
    pub fn purge_expired(&self) -> usize {
        let removed = self.inner.store.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, "purged expired entries");
        }
        removed
    }

    /// Get a snapshot of the cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.store.stats().snapshot()
    }

    /// Get a reference to the internal statistics counter.
    ///
    /// This is useful for integrating with external metrics systems.
    pub fn stats_ref(&self) -> Arc<CacheStats> {
        self.inner.store.stats()
    }
}

impl<V, E> CoalescingCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Return the outcome for `key`, running `loader` only if needed.
    ///
    /// - A fresh stored outcome is returned without calling `loader`.
    /// - If a load for `key` is already running, the returned future resolves
    ///   to that load's outcome and `loader` is dropped unused.
    /// - Otherwise `loader(key)` is spawned onto the current tokio runtime and
    ///   its outcome is stored, errors included, for the freshness window.
    ///
    /// The load runs to completion even if every returned future is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime. The returned future panics
    /// if the load it waits on ended without a result, i.e. the loader
    /// panicked or its task was cancelled by runtime shutdown.
    pub fn get_or_load<K, F, Fut>(&self, key: K, loader: F) -> Lookup<V, E>
    where
        K: Into<String>,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.ensure_sweeper();

        let key = key.into();
        match self.inner.store.access(&key) {
            Access::Fresh(outcome) => {
                tracing::trace!(key = %key, "fresh hit");
                Lookup::ready(outcome)
            }
            Access::Pending(slot) => {
                tracing::trace!(key = %key, "joined running load");
                Lookup::waiting(key, slot)
            }
            Access::Claimed { sender, slot } => {
                tracing::debug!(key = %key, "starting load");
                let publisher = Publisher {
                    inner: Arc::clone(&self.inner),
                    key: key.clone(),
                    sender: Some(sender),
                };
                let load = loader(key.clone());
                tokio::spawn(async move {
                    let outcome = load.await;
                    publisher.publish(outcome);
                });
                Lookup::waiting(key, slot)
            }
        }
    }

    /// Populate `key` in the background without waiting for the outcome.
    ///
    /// Behaves like [`get_or_load`](Self::get_or_load) with the returned
    /// future dropped.
    pub fn warm<K, F, Fut>(&self, key: K, loader: F)
    where
        K: Into<String>,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        drop(self.get_or_load(key, loader));
    }

    fn ensure_sweeper(&self) {
        let config = self.config();
        let running = &self.inner.sweeper_running;
        if !config.is_background_purge() || running.load(Ordering::Acquire) {
            return;
        }
        if running.swap(true, Ordering::AcqRel) {
            return;
        }

        // Built before spawning, so the flag is cleared even if the task is
        // never polled.
        let guard = SweeperGuard(Arc::clone(running));
        let period = config.get_sweep_interval();
        tokio::spawn(sweep(Arc::downgrade(&self.inner), period, guard));
        tracing::debug!(?period, "started background sweep");
    }
}

impl<V, E> Default for CoalescingCache<V, E> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Clears the sweeper flag when the sweep task ends, whether it exits on its
/// own or is dropped with its runtime.
struct SweeperGuard(Arc<AtomicBool>);

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically purges the store until every cache handle and running load
/// is gone.
async fn sweep<V, E>(cache: Weak<Inner<V, E>>, period: Duration, _guard: SweeperGuard) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = cache.upgrade() else {
            break;
        };
        let removed = inner.store.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, "sweep purged expired entries");
        }
    }

    tracing::trace!("cache dropped, sweeper exiting");
}

/// Owns the in-flight slot of one load until its outcome is published.
///
/// Dropped without publishing (loader panic, task cancelled), it retires the
/// slot so the next lookup starts a fresh load; waiters see the channel close.
struct Publisher<V, E> {
    inner: Arc<Inner<V, E>>,
    key: String,
    sender: Option<oneshot::Sender<Result<V, E>>>,
}

impl<V: Clone, E: Clone> Publisher<V, E> {
    fn publish(mut self, outcome: Result<V, E>) {
        if outcome.is_err() {
            tracing::debug!(key = %self.key, "load failed, caching error");
        }
        // Store first: a lookup that misses the slot must find the entry.
        self.inner.store.complete(&self.key, outcome.clone());
        if let Some(sender) = self.sender.take() {
            // Every waiter may have given up already.
            let _ = sender.send(outcome);
        }
    }
}

impl<V, E> Drop for Publisher<V, E> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            tracing::error!(key = %self.key, "load ended without a result");
            self.inner.store.abandon(&self.key);
        }
    }
}

/// Future returned by [`CoalescingCache::get_or_load`].
///
/// Resolves to the loader's outcome for the requested key, shared with every
/// other caller that asked for the key while the load was running.
///
/// # Panics
///
/// Polling a `Lookup` again after it returned [`Poll::Ready`] panics. Polling
/// also panics if the load it waits on ended without a result, because the
/// loader panicked or its task was cancelled by runtime shutdown.
#[must_use = "dropping a `Lookup` does not cancel the load, but discards its outcome"]
pub struct Lookup<V, E> {
    state: LookupState<V, E>,
}

enum LookupState<V, E> {
    Ready(Option<Result<V, E>>),
    Waiting { key: String, slot: Slot<V, E> },
}

impl<V, E> Lookup<V, E> {
    fn ready(outcome: Result<V, E>) -> Self {
        Self {
            state: LookupState::Ready(Some(outcome)),
        }
    }

    fn waiting(key: String, slot: Slot<V, E>) -> Self {
        Self {
            state: LookupState::Waiting { key, slot },
        }
    }

    /// Whether this lookup was answered from a fresh entry, without waiting
    /// on a load.
    pub fn is_hit(&self) -> bool {
        matches!(self.state, LookupState::Ready(_))
    }
}

// `Lookup` never pins its fields: the outcome is moved out by value and
// `Shared` is `Unpin`.
impl<V, E> Unpin for Lookup<V, E> {}

impl<V, E> Future for Lookup<V, E>
where
    V: Clone,
    E: Clone,
{
    type Output = Result<V, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            LookupState::Ready(outcome) => {
                Poll::Ready(outcome.take().expect("`Lookup` polled after completion"))
            }
            LookupState::Waiting { key, slot } => match slot.poll_unpin(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(oneshot::Canceled)) => {
                    panic!("load for key `{key}` ended without a result")
                }
            },
        }
    }
}

impl<V, E> fmt::Debug for Lookup<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            LookupState::Ready(_) => f.debug_struct("Lookup").field("hit", &true).finish(),
            LookupState::Waiting { key, .. } => f
                .debug_struct("Lookup")
                .field("hit", &false)
                .field("key", key)
                .finish(),
        }
    }
}
