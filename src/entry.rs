//! Stored load outcome with the metadata needed for freshness and purging.

use std::time::Duration;
use tokio::time::Instant;

/// A single cache entry: the outcome of one loader run.
///
/// Failed loads are stored too, so an upstream that keeps failing is only
/// asked again once the entry goes stale.
#[derive(Debug, Clone)]
pub struct Entry<V, E> {
    /// What the loader returned.
    pub(crate) outcome: Result<V, E>,

    /// When the loader's result was stored.
    pub(crate) stored_at: Instant,
}

impl<V, E> Entry<V, E> {
    /// Create an entry stored at `now`.
    pub fn new(outcome: Result<V, E>, now: Instant) -> Self {
        Self {
            outcome,
            stored_at: now,
        }
    }

    /// Whether the entry may still be served without reloading.
    pub fn is_fresh_at(&self, now: Instant, fresh: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < fresh
    }

    /// Whether the entry has outlived the purge horizon.
    pub fn is_purgeable_at(&self, now: Instant, purge: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) >= purge
    }

    /// Get a reference to the stored outcome.
    pub fn outcome(&self) -> &Result<V, E> {
        &self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRESH: Duration = Duration::from_secs(60);
    const PURGE: Duration = Duration::from_secs(120);

    #[test]
    fn test_new_entry_is_fresh() {
        let now = Instant::now();
        let entry: Entry<&str, ()> = Entry::new(Ok("value"), now);
        assert!(entry.is_fresh_at(now, FRESH));
        assert!(!entry.is_purgeable_at(now, PURGE));
    }

    #[test]
    fn test_stale_but_not_purgeable() {
        let now = Instant::now();
        let entry: Entry<&str, ()> = Entry::new(Ok("value"), now);
        let later = now + Duration::from_secs(90);
        assert!(!entry.is_fresh_at(later, FRESH));
        assert!(!entry.is_purgeable_at(later, PURGE));
    }

    #[test]
    fn test_purgeable_at_horizon() {
        let now = Instant::now();
        let entry: Entry<(), &str> = Entry::new(Err("upstream down"), now);
        assert!(entry.is_purgeable_at(now + PURGE, PURGE));
        assert_eq!(entry.outcome(), &Err("upstream down"));
    }

    #[test]
    fn test_freshness_boundary_is_exclusive() {
        let now = Instant::now();
        let entry: Entry<u32, ()> = Entry::new(Ok(1), now);
        assert!(entry.is_fresh_at(now + FRESH - Duration::from_nanos(1), FRESH));
        assert!(!entry.is_fresh_at(now + FRESH, FRESH));
    }
}
