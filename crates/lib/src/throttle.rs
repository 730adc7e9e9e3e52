//! Fixed-interval gate between classification calls.
//!
//! [`IntervalGate::wait`] returns once `interval` has elapsed since the last [`IntervalGate::mark`].
//! The first call never waits.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct IntervalGate {
    interval: Duration,
    last: Option<Instant>,
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Earliest instant the next call may start, if a call has been marked.
    pub fn next_allowed(&self) -> Option<Instant> {
        self.last.map(|t| t + self.interval)
    }

    /// Sleep until the interval since the last mark has elapsed.
    pub async fn wait(&self) {
        if let Some(at) = self.next_allowed() {
            if at > Instant::now() {
                log::debug!("throttle: waiting {:?}", at - Instant::now());
                tokio::time::sleep_until(at).await;
            }
        }
    }

    /// Record that a call just finished.
    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}
