//! Error types for the coalescing cache.
//!
//! The cache relays whatever error a loader produces without wrapping it, so
//! the only failures owned by this crate are the ones raised while building a
//! configuration.

use std::time::Duration;

/// The error type for the crate's own fallible operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// A duration that must be positive was zero.
    #[error("invalid configuration: {field} must be greater than zero")]
    ZeroDuration {
        /// Name of the offending setting.
        field: &'static str,
    },

    /// The purge horizon would evict entries while they are still fresh.
    #[error(
        "invalid configuration: purge interval ({purge:?}) is shorter than fresh duration ({fresh:?})"
    )]
    PurgeBeforeFresh {
        /// Configured freshness window.
        fresh: Duration,
        /// Configured purge horizon.
        purge: Duration,
    },
}

/// A specialized Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
