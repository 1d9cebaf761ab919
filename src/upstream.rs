//! A slow, occasionally failing stand-in for the chat platform's directory
//! API, used by the demo binary as the cache loader.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Errors the simulated upstream can return.
///
/// `Clone` so one failure can be handed to every waiter of a load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream unavailable")]
    Unavailable,
    #[error("upstream rejected the request: {0}")]
    Rejected(String),
    #[error("malformed upstream response")]
    Malformed,
}

/// Simulated directory API that counts how often it is called.
#[derive(Debug, Clone)]
pub struct Upstream {
    latency: Duration,
    fail_every: u64,
    calls: Arc<AtomicU64>,
}

impl Upstream {
    pub fn new(latency: Duration, fail_every: u64) -> Self {
        Self {
            latency,
            fail_every,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total number of fetches performed.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Fetch the destination listing for `key`.
    pub async fn fetch_destinations(&self, key: String) -> Result<Bytes, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::time::sleep(self.latency).await;

        if self.fail_every > 0 && call % self.fail_every == 0 {
            tracing::warn!(key = %key, call, "upstream call failed");
            return Err(match call / self.fail_every % 3 {
                0 => UpstreamError::Unavailable,
                1 => UpstreamError::Rejected("rate limited".to_string()),
                _ => UpstreamError::Malformed,
            });
        }

        tracing::debug!(key = %key, call, "upstream call succeeded");
        Ok(Bytes::from(format!("destinations for {key} (fetch {call}): @here #general")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_calls() {
        let upstream = Upstream::new(Duration::from_millis(100), 0);
        let body = upstream.fetch_destinations("k".to_string()).await.unwrap();
        assert_eq!(&body[..], b"destinations for k (fetch 1): @here #general");
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_every_nth_call() {
        let upstream = Upstream::new(Duration::from_millis(1), 2);
        assert!(upstream.fetch_destinations("k".into()).await.is_ok());
        assert_eq!(
            upstream.fetch_destinations("k".into()).await,
            Err(UpstreamError::Rejected("rate limited".to_string()))
        );
        assert!(upstream.fetch_destinations("k".into()).await.is_ok());
        assert_eq!(upstream.calls(), 3);
    }
}
