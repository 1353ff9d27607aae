//! Sliding-window admission limiter.
//!
//! # Responsibilities
//! - Cap how many times an action may run within a rolling window
//! - Report how long a limited caller has to wait
//! - Purge stale timestamps lazily on every query
//!
//! Distinct from the transport limiter: this caps caller-triggered actions
//! before any network call happens.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Thread-safe sliding-window call cap.
pub struct AdmissionLimiter {
    period: Duration,
    max_calls: usize,
    calls: Mutex<Vec<Instant>>,
}

impl AdmissionLimiter {
    /// Create a limiter allowing `max_calls` per `period`.
    pub fn new(period: Duration, max_calls: usize) -> Self {
        Self {
            period,
            max_calls,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Check whether the limit is reached.
    ///
    /// Returns `(limited, seconds_to_wait)`; the wait is at least 1 second
    /// whenever the limit is active, and 0 otherwise.
    pub fn is_limited(&self) -> (bool, u64) {
        let mut calls = self.calls.lock().expect("admission window mutex poisoned");
        let now = Instant::now();
        Self::purge(&mut calls, now, self.period);

        if calls.len() >= self.max_calls {
            // Wait until the oldest recorded call leaves the window.
            let oldest = calls
                .iter()
                .min()
                .copied()
                .unwrap_or(now);
            let elapsed = now.duration_since(oldest);
            let wait = self.period.saturating_sub(elapsed).as_secs_f64().ceil() as u64;
            return (true, wait.max(1));
        }

        (false, 0)
    }

    /// Record a call at the current instant.
    pub fn record_call(&self) {
        let mut calls = self.calls.lock().expect("admission window mutex poisoned");
        calls.push(Instant::now());
    }

    /// Number of calls still allowed in the current window.
    pub fn remaining(&self) -> usize {
        let mut calls = self.calls.lock().expect("admission window mutex poisoned");
        Self::purge(&mut calls, Instant::now(), self.period);
        self.max_calls.saturating_sub(calls.len())
    }

    fn purge(calls: &mut Vec<Instant>, now: Instant, period: Duration) {
        calls.retain(|t| now.duration_since(*t) < period);
    }
}
