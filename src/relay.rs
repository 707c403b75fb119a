//! Sliding-window limiter for relayed agent events
//!
//! Caps how many `widget:message` events reach the host hook within a
//! rolling window. Timestamps come from the widget's scheduler clock, so the
//! limiter works the same under real and simulated time.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Limit: at most `max_events` per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayLimit {
    pub max_events: usize,
    pub window: Duration,
}

/// Sliding-window counter
#[derive(Debug, Clone)]
pub struct RelayLimiter {
    limit: RelayLimit,
    /// Accepted event times, oldest at the front
    hits: VecDeque<Duration>,
}

impl RelayLimiter {
    pub fn new(limit: RelayLimit) -> Self {
        Self {
            limit,
            hits: VecDeque::with_capacity(limit.max_events.min(1024)),
        }
    }

    pub fn limit(&self) -> RelayLimit {
        self.limit
    }

    /// Record an event at `now` if the window has room.
    pub fn allow(&mut self, now: Duration) -> bool {
        self.evict(now);
        if self.hits.len() >= self.limit.max_events {
            return false;
        }
        self.hits.push_back(now);
        true
    }

    /// Events counted in the window ending at `now`
    pub fn in_window(&mut self, now: Duration) -> usize {
        self.evict(now);
        self.hits.len()
    }

    fn evict(&mut self, now: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_sub(*oldest) >= self.limit.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}
