//! Minimum-interval throttle for outbound provider calls.
//!
//! Only the gap since the previous call start is enforced, so a request
//! arriving after a quiet period goes out immediately.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Tracks the last call start and enforces a minimum spacing.
#[derive(Debug)]
pub struct MinInterval {
    interval: Duration,
    last: Option<Instant>,
}

impl MinInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Remaining wait before a call may start at `now`.
    pub fn delay_at(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Record a call start at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Wait out the remaining interval, then record the call start.
    pub async fn acquire(&mut self) {
        let delay = self.delay_at(Instant::now());
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "throttling provider call");
            tokio::time::sleep(delay).await;
        }
        self.mark(Instant::now());
    }
}
