//! Popup liveness poll.
//!
//! A cancellable fixed-interval timer meant to sit in a `tokio::select!`
//! loop next to the message channel. While stopped,
//! [`LivenessPoller::wait_for_poll`] pends forever, so the select only
//! wakes for messages.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

/// Default poll interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct LivenessPoller {
    interval: Duration,
    next_poll: Option<Instant>,
    polls: u64,
}

impl Default for LivenessPoller {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}

impl LivenessPoller {
    /// A stopped poller. A zero interval is bumped to one millisecond.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_poll: None,
            polls: 0,
        }
    }

    /// Schedules the first poll one interval from now. No-op if running.
    pub fn start(&mut self) {
        if self.next_poll.is_none() {
            self.next_poll = Some(Instant::now() + self.interval);
            trace!(interval_ms = self.interval.as_millis() as u64, "liveness poll started");
        }
    }

    /// Cancels the pending poll. Idempotent.
    pub fn stop(&mut self) {
        if self.next_poll.take().is_some() {
            trace!(polls = self.polls, "liveness poll stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.next_poll.is_some()
    }

    /// Polls fired since creation.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next poll and returns its number (starting at 1).
    ///
    /// Pends forever while stopped. Cancel-safe: dropping the future before
    /// it fires leaves the schedule untouched.
    pub async fn wait_for_poll(&mut self) -> u64 {
        let Some(next) = self.next_poll else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(next).await;

        self.polls += 1;
        self.next_poll = Some(Instant::now() + self.interval);
        self.polls
    }
}
