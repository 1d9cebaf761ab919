//! Demo driver for the coalescing cache.
//!
//! Runs rounds of concurrent lookups against a simulated upstream and logs
//! how many upstream calls the cache let through:
//!
//! ```bash
//! RUST_LOG=coalescing_cache=debug cargo run -- --callers 64 --keys 2
//! ```

mod upstream;

use bytes::Bytes;
use clap::Parser;
use futures::future::join_all;
use std::time::Duration;
use tracing::info;

use coalescing_cache::keys::{composite_key, hash_token};
use coalescing_cache::{Cli, CoalescingCache};
use upstream::{Upstream, UpstreamError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coalescing_cache=info,coalesce_demo=info".into()),
        )
        .init();

    let args = Cli::parse();
    anyhow::ensure!(args.keys > 0, "--keys must be at least 1");

    let cache: CoalescingCache<Bytes, UpstreamError> = CoalescingCache::new(args.cache_config()?);
    let upstream = Upstream::new(Duration::from_millis(args.latency_ms), args.fail_every);

    let keys: Vec<String> = (0..args.keys)
        .map(|i| composite_key([hash_token(&format!("xoxp-demo-{i}")).as_str(), "destinations"]))
        .collect();

    info!(
        callers = args.callers,
        keys = args.keys,
        rounds = args.rounds,
        "starting demo"
    );

    for round in 1..=args.rounds {
        let before = upstream.calls();

        let lookups = (0..args.callers).map(|caller| {
            let key = keys[caller % keys.len()].clone();
            let upstream = upstream.clone();
            cache.get_or_load(key, move |key| async move { upstream.fetch_destinations(key).await })
        });
        let outcomes = join_all(lookups).await;

        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        info!(
            round,
            upstream_calls = upstream.calls() - before,
            failed,
            entries = cache.len(),
            "round complete"
        );

        tokio::time::sleep(Duration::from_millis(args.pause_ms)).await;
    }

    let stats = cache.stats();
    info!(
        upstream_calls = upstream.calls(),
        hits = stats.hits,
        coalesced = stats.coalesced,
        loads = stats.misses,
        load_errors = stats.load_errors,
        purged = stats.purged,
        hit_rate = %format_args!("{:.1}%", stats.hit_rate),
        "demo finished"
    );

    Ok(())
}
