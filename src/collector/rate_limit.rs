use async_trait::async_trait;
use std::time::Duration;

/// Pacing between venue requests. Injected so tests run without real
/// delays; blocks until the next request is permitted.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}

/// Fixed post-request pause, the venues' documented expectation for
/// history endpoints. Not adaptive.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl RateLimiter for FixedDelay {
    async fn acquire(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// No pacing; used by tests.
pub struct NoDelay;

#[async_trait]
impl RateLimiter for NoDelay {
    async fn acquire(&self) {}
}
