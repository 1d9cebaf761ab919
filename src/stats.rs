//! Statistics for the cache.
//!
//! This module provides atomic counters for tracking lookups and loads,
//! enabling observability without contending on the cache lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache operations.
///
/// All counters are atomic and can be safely accessed from multiple threads.
/// Use `CoalescingCache::stats()` to get a snapshot of the current statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups served from a fresh entry.
    hits: AtomicU64,

    /// Lookups that joined a load already in flight.
    coalesced: AtomicU64,

    /// Lookups that started a new load.
    misses: AtomicU64,

    /// Loads whose loader returned an error.
    load_errors: AtomicU64,

    /// Loads that never published an outcome (panicked or cancelled).
    load_aborts: AtomicU64,

    /// Entries removed by the purge sweep.
    purged: AtomicU64,

    /// Current number of stored entries.
    size: AtomicU64,
}

impl CacheStats {
    /// Create a new stats instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup served from a fresh entry.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that joined an in-flight load.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that started a load.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a load that finished with an error.
    pub fn record_load_error(&self) {
        self.load_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a load that ended without an outcome.
    pub fn record_load_abort(&self) {
        self.load_aborts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record entries removed by a sweep.
    pub fn record_purged(&self, count: u64) {
        self.purged.fetch_add(count, Ordering::Relaxed);
    }

    /// Set the size to a specific value.
    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    /// Get the number of fresh hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get the number of lookups that joined an in-flight load.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Get the number of loads started.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the number of failed loads.
    pub fn load_errors(&self) -> u64 {
        self.load_errors.load(Ordering::Relaxed)
    }

    /// Get the number of aborted loads.
    pub fn load_aborts(&self) -> u64 {
        self.load_aborts.load(Ordering::Relaxed)
    }

    /// Get the number of purged entries.
    pub fn purged(&self) -> u64 {
        self.purged.load(Ordering::Relaxed)
    }

    /// Get the current number of stored entries.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Percentage (0.0 to 100.0) of lookups that did not start a load.
    /// Returns 0.0 if no lookups have been performed.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits() + self.coalesced();
        let total = served + self.misses();
        if total == 0 {
            0.0
        } else {
            (served as f64 / total as f64) * 100.0
        }
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            coalesced: self.coalesced(),
            misses: self.misses(),
            load_errors: self.load_errors(),
            load_aborts: self.load_aborts(),
            purged: self.purged(),
            size: self.size(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// A point-in-time snapshot of cache statistics.
///
/// Unlike `CacheStats`, this struct contains plain values (not atomics)
/// and can be easily logged.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub coalesced: u64,
    pub misses: u64,
    pub load_errors: u64,
    pub load_aborts: u64,
    pub purged: u64,
    pub size: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_stats() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 0);
        assert_eq!(stats.size(), 0);
    }

    #[test]
    fn test_hit_rate_counts_coalesced_as_served() {
        let stats = CacheStats::new();

        assert_eq!(stats.hit_rate(), 0.0);

        // 2 hits + 1 coalesced, 1 miss = 75%
        stats.record_hit();
        stats.record_hit();
        stats.record_coalesced();
        stats.record_miss();

        assert!((stats.hit_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_snapshot() {
        let stats = CacheStats::new();
        stats.record_miss();
        stats.record_load_error();
        stats.record_purged(3);
        stats.set_size(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.load_errors, 1);
        assert_eq!(snapshot.purged, 3);
        assert_eq!(snapshot.size, 2);
        assert_eq!(snapshot.hit_rate, 0.0);
    }
}
