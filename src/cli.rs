//! Command-line interface definitions.
//!
//! This module defines the arguments of the `coalesce-demo` binary using
//! clap.

use clap::Parser;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::CacheResult;

/// Drive a coalescing cache with bursts of concurrent lookups against a slow,
/// simulated upstream and report how many upstream calls were made.
#[derive(Parser, Debug)]
#[command(name = "coalesce-demo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Concurrent callers per round.
    #[arg(long, default_value_t = 32)]
    pub callers: usize,

    /// Distinct credentials the callers are spread across.
    #[arg(long, default_value_t = 4)]
    pub keys: usize,

    /// Number of rounds to run.
    #[arg(long, default_value_t = 5)]
    pub rounds: usize,

    /// Pause between rounds, in milliseconds.
    #[arg(long, default_value_t = 150)]
    pub pause_ms: u64,

    /// Simulated upstream latency, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub latency_ms: u64,

    /// Make every Nth upstream call fail (0 disables failures).
    #[arg(long, default_value_t = 0)]
    pub fail_every: u64,

    /// How long a loaded value is served, in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub fresh_ms: u64,

    /// Age after which entries are purged, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub purge_ms: u64,
}

impl Cli {
    /// Build the cache configuration described by the flags.
    pub fn cache_config(&self) -> CacheResult<CacheConfig> {
        CacheConfig::builder()
            .fresh_duration(Duration::from_millis(self.fresh_ms))
            .purge_interval(Duration::from_millis(self.purge_ms))
            .build()
    }
}
