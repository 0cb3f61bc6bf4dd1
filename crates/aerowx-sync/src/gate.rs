//! Spacing between upstream calls.
//!
//! The upstream API allows 100 requests per minute. Every call goes through
//! a gate first; the default gate is a single-cell bucket that refills once
//! per spacing period, so consecutive calls are at least that far apart
//! regardless of airport or report type.

use std::time::Duration;

use aerowx_core::UpstreamConfig;
use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovLimiter};

type DirectLimiter = GovLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[async_trait]
pub trait RateGate: Send + Sync {
    /// Wait until the next upstream call may start.
    async fn acquire(&self);
}

/// Enforces a minimum gap between consecutive acquisitions.
pub struct MinSpacingGate {
    /// `None` for a zero spacing.
    limiter: Option<DirectLimiter>,
}

impl MinSpacingGate {
    pub fn new(spacing: Duration) -> Self {
        Self {
            limiter: Quota::with_period(spacing).map(GovLimiter::direct),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Gate for the configured upstream, never spaced below the floor.
    pub fn for_upstream(config: &UpstreamConfig) -> Self {
        Self::new(config.request_spacing())
    }
}

#[async_trait]
impl RateGate for MinSpacingGate {
    async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    async fn gaps(gate: &MinSpacingGate, calls: usize) -> Vec<Duration> {
        let mut stamps = Vec::new();
        for _ in 0..calls {
            gate.acquire().await;
            stamps.push(Instant::now());
        }
        stamps.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let gate = MinSpacingGate::from_millis(700);
        let start = Instant::now();
        gate.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_consecutive_acquires_are_spaced() {
        let gate = MinSpacingGate::from_millis(150);
        for gap in gaps(&gate, 4).await {
            assert!(gap >= Duration::from_millis(150), "{:?}", gap);
        }
    }

    #[tokio::test]
    async fn test_no_wait_after_idle_period() {
        let gate = MinSpacingGate::from_millis(150);
        gate.acquire().await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let start = Instant::now();
        gate.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_spacing_never_waits() {
        let gate = MinSpacingGate::from_millis(0);
        let start = Instant::now();
        for _ in 0..10 {
            gate.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_configured_spacing_cannot_go_below_floor() {
        let config = UpstreamConfig {
            min_request_spacing_ms: 100,
            ..UpstreamConfig::default()
        };
        let gate = MinSpacingGate::for_upstream(&config);
        for gap in gaps(&gate, 3).await {
            assert!(gap >= Duration::from_millis(700), "{:?}", gap);
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let gate = Arc::new(MinSpacingGate::from_millis(150));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    gate.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut stamps = Vec::new();
        for handle in handles {
            if let Ok(stamp) = handle.await {
                stamps.push(stamp);
            }
        }
        stamps.sort();

        assert_eq!(stamps.len(), 3);
        assert!(stamps[2] - start >= Duration::from_millis(300));
    }
}
