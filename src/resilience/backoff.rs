//! Exponential backoff with pluggable jitter.

use rand::Rng;

/// Calculate the un-jittered exponential backoff delay for an attempt.
///
/// `attempt` is 0-indexed: attempt 0 waits `base_secs`.
pub fn retry_delay(attempt: u32, base_secs: f64, factor: f64, max_secs: f64) -> f64 {
    (base_secs * factor.powi(attempt as i32)).min(max_secs)
}

/// Jitter strategy applied on top of a computed delay.
///
/// Pluggable so tests can substitute [`NoJitter`] and assert exact delays.
pub trait Jitter: Send + Sync {
    /// Return the delay to actually sleep for.
    fn apply(&self, delay_secs: f64) -> f64;
}

/// Uniform jitter: scales the delay by a factor in [0.5, 1.0].
///
/// Shrinking rather than growing the delay keeps the configured maximum an
/// upper bound while still spreading out retries.
pub struct UniformJitter;

impl Jitter for UniformJitter {
    fn apply(&self, delay_secs: f64) -> f64 {
        delay_secs * rand::thread_rng().gen_range(0.5..=1.0)
    }
}

/// Identity jitter for tests and deterministic configurations.
pub struct NoJitter;

impl Jitter for NoJitter {
    fn apply(&self, delay_secs: f64) -> f64 {
        delay_secs
    }
}
