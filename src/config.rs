//! Configuration for the coalescing cache.
//!
//! This module provides a builder for the two durations that govern the
//! cache: how long a loaded value is served without reloading, and how long
//! an entry may linger before the background sweep removes it.

use std::time::Duration;

use crate::error::{CacheError, CacheResult};

/// Default freshness window.
const DEFAULT_FRESH: Duration = Duration::from_secs(5 * 60);

/// Default purge horizon.
const DEFAULT_PURGE: Duration = Duration::from_secs(10 * 60);

/// Validated configuration for a cache instance.
///
/// A `CacheConfig` can only be obtained from [`CacheConfigBuilder::build`]
/// or [`Default`], so every cache runs with checked durations:
///
/// ```
/// use coalescing_cache::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::builder()
///     .fresh_duration(Duration::from_secs(60))
///     .purge_interval(Duration::from_secs(120))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.get_fresh_duration(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a stored outcome is returned without invoking the loader.
    fresh_duration: Duration,

    /// Age after which an entry may be evicted by the sweep.
    purge_interval: Duration,

    /// How often the background sweep runs.
    sweep_interval: Duration,

    /// Whether to run the background sweep task.
    background_purge: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_duration: DEFAULT_FRESH,
            purge_interval: DEFAULT_PURGE,
            sweep_interval: DEFAULT_PURGE,
            background_purge: true,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration builder with default values.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Settings for user and group directory listings: five minutes fresh,
    /// purged after ten.
    pub fn directory_listing() -> CacheConfigBuilder {
        Self::builder()
            .fresh_duration(Duration::from_secs(5 * 60))
            .purge_interval(Duration::from_secs(10 * 60))
    }

    /// Settings for team metadata, which rarely changes: twelve hours for
    /// both windows.
    pub fn team_metadata() -> CacheConfigBuilder {
        Self::builder()
            .fresh_duration(Duration::from_secs(12 * 60 * 60))
            .purge_interval(Duration::from_secs(12 * 60 * 60))
    }

    /// Get the freshness window.
    pub fn get_fresh_duration(&self) -> Duration {
        self.fresh_duration
    }

    /// Get the purge horizon.
    pub fn get_purge_interval(&self) -> Duration {
        self.purge_interval
    }

    /// Get the effective sweep period.
    pub fn get_sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Whether the background sweep is enabled.
    pub fn is_background_purge(&self) -> bool {
        self.background_purge
    }
}

/// Builder for [`CacheConfig`]. Nothing is checked until [`build`](Self::build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfigBuilder {
    fresh_duration: Duration,
    purge_interval: Duration,
    /// `None` follows `purge_interval`.
    sweep_interval: Option<Duration>,
    background_purge: bool,
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self {
            fresh_duration: DEFAULT_FRESH,
            purge_interval: DEFAULT_PURGE,
            sweep_interval: None,
            background_purge: true,
        }
    }
}

impl CacheConfigBuilder {
    /// Set how long a loaded value (or error) is served from the cache.
    pub fn fresh_duration(mut self, duration: Duration) -> Self {
        self.fresh_duration = duration;
        self
    }

    /// Set the age after which an entry becomes eligible for eviction.
    ///
    /// Must not be shorter than the fresh duration.
    pub fn purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Set how often the background sweep runs.
    ///
    /// Defaults to the purge interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Enable or disable the background sweep.
    ///
    /// When disabled, entries are only removed by
    /// [`CoalescingCache::purge_expired`](crate::CoalescingCache::purge_expired)
    /// or overwritten on reload.
    pub fn background_purge(mut self, enabled: bool) -> Self {
        self.background_purge = enabled;
        self
    }

    /// Validate the settings and return the final configuration.
    ///
    /// Rejects zero durations and a purge horizon shorter than the freshness
    /// window, which would evict entries that are still fresh.
    pub fn build(self) -> CacheResult<CacheConfig> {
        if self.fresh_duration.is_zero() {
            return Err(CacheError::ZeroDuration {
                field: "fresh_duration",
            });
        }
        if self.purge_interval.is_zero() {
            return Err(CacheError::ZeroDuration {
                field: "purge_interval",
            });
        }
        if self.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(CacheError::ZeroDuration {
                field: "sweep_interval",
            });
        }
        if self.purge_interval < self.fresh_duration {
            return Err(CacheError::PurgeBeforeFresh {
                fresh: self.fresh_duration,
                purge: self.purge_interval,
            });
        }
        Ok(CacheConfig {
            fresh_duration: self.fresh_duration,
            purge_interval: self.purge_interval,
            sweep_interval: self.sweep_interval.unwrap_or(self.purge_interval),
            background_purge: self.background_purge,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.fresh_duration, Duration::from_secs(300));
        assert_eq!(config.purge_interval, Duration::from_secs(600));
        assert_eq!(config.get_sweep_interval(), Duration::from_secs(600));
        assert!(config.background_purge);
        assert_eq!(CacheConfig::builder().build(), Ok(config));
    }

    #[test]
    fn test_builder_pattern() {
        let config = CacheConfig::builder()
            .fresh_duration(Duration::from_millis(50))
            .purge_interval(Duration::from_millis(100))
            .sweep_interval(Duration::from_millis(10))
            .background_purge(false)
            .build()
            .unwrap();

        assert_eq!(config.get_fresh_duration(), Duration::from_millis(50));
        assert_eq!(config.get_purge_interval(), Duration::from_millis(100));
        assert_eq!(config.get_sweep_interval(), Duration::from_millis(10));
        assert!(!config.is_background_purge());
    }

    #[test]
    fn test_presets() {
        let listing = CacheConfig::directory_listing().build().unwrap();
        assert_eq!(listing.get_fresh_duration(), Duration::from_secs(300));
        assert_eq!(listing.get_purge_interval(), Duration::from_secs(600));

        let team = CacheConfig::team_metadata().build().unwrap();
        assert_eq!(team.get_fresh_duration(), Duration::from_secs(43_200));
        assert_eq!(team.get_purge_interval(), Duration::from_secs(43_200));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let err = CacheConfig::builder()
            .fresh_duration(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CacheError::ZeroDuration {
                field: "fresh_duration"
            }
        );

        let err = CacheConfig::builder()
            .sweep_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CacheError::ZeroDuration {
                field: "sweep_interval"
            }
        );
    }

    #[test]
    fn test_purge_shorter_than_fresh_rejected() {
        let err = CacheConfig::builder()
            .fresh_duration(Duration::from_secs(10))
            .purge_interval(Duration::from_secs(5))
            .build()
            .unwrap_err();
        assert!(matches!(err, CacheError::PurgeBeforeFresh { .. }));
    }

    #[test]
    fn test_equal_windows_allowed() {
        let config = CacheConfig::builder()
            .fresh_duration(Duration::from_secs(30))
            .purge_interval(Duration::from_secs(30))
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_zero_purge_rejected() {
        let err = CacheConfig::builder()
            .purge_interval(Duration::ZERO)
            .sweep_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CacheError::ZeroDuration {
                field: "purge_interval"
            }
        );
    }

    #[test]
    fn test_presets_can_be_adjusted_before_build() {
        let err = CacheConfig::team_metadata()
            .purge_interval(Duration::from_secs(60))
            .build()
            .unwrap_err();
        assert!(matches!(err, CacheError::PurgeBeforeFresh { .. }));

        let config = CacheConfig::directory_listing()
            .sweep_interval(Duration::from_secs(30))
            .build()
            .unwrap();
        assert_eq!(config.get_sweep_interval(), Duration::from_secs(30));
    }
}
