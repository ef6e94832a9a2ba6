//! Injectable sleep used for pacing and retry backoff

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the calling task for a duration.
///
/// Production code uses [`TokioSleeper`]; tests substitute an implementation
/// that records the requested durations and returns immediately.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
