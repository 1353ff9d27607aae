//! Protocol-aware transport limiter.
//!
//! # Responsibilities
//! - Track global and per-bucket backoff windows from rate-limit signals
//! - Execute chat API calls with classified, jittered exponential retry
//! - Expose current backoff state for status reporting
//!
//! A bucket is `method:endpoint-class`; windows for different buckets never
//! block each other. The retry loop is the only place that decides whether a
//! [`ChatError`] is worth retrying.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::clock::epoch_secs;
use crate::notify::{Attachment, ChatError, ChatTransport, MessageRef};
use crate::observability::metrics;
use crate::resilience::backoff::{retry_delay, Jitter, UniformJitter};

/// Retry budget and delay shape for transport calls.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in seconds for attempt 0.
    pub base_delay_secs: f64,
    /// Upper bound on any computed delay.
    pub max_delay_secs: f64,
    /// Exponential growth factor.
    pub backoff_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 60.0,
            backoff_factor: 2.0,
        }
    }
}

#[derive(Default)]
struct BackoffState {
    global_reset_at: Option<f64>,
    buckets: HashMap<String, f64>,
}

/// Snapshot of the limiter's backoff windows, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BackoffInfo {
    /// Whether a global backoff window is active.
    pub global_limited: bool,
    /// Seconds until the global window clears (0 when inactive).
    pub global_reset_in: f64,
    /// Buckets with an active backoff window.
    pub active_buckets: Vec<String>,
}

/// Chat API call executor with backoff-window tracking.
pub struct TransportLimiter {
    policy: BackoffPolicy,
    jitter: Box<dyn Jitter>,
    state: Mutex<BackoffState>,
}

impl TransportLimiter {
    /// Create a limiter with uniform jitter.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_jitter(policy, Box::new(UniformJitter))
    }

    /// Create a limiter with an explicit jitter strategy.
    pub fn with_jitter(policy: BackoffPolicy, jitter: Box<dyn Jitter>) -> Self {
        Self {
            policy,
            jitter,
            state: Mutex::new(BackoffState::default()),
        }
    }

    /// Execute `call` with backoff-window waits and classified retry.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` if the attempt budget
    /// ran out without a propagating error, and `Err` for permanent failures
    /// or transient ones that exhausted the budget.
    pub async fn execute<T, F, Fut>(
        &self,
        mut call: F,
        endpoint: &str,
        method: &str,
    ) -> Result<Option<T>, ChatError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChatError>>,
    {
        let bucket = format!("{method}:{endpoint}");

        for attempt in 0..=self.policy.max_retries {
            let wait = self.active_backoff(&bucket);
            if wait > 0.0 {
                tracing::info!(bucket = %bucket, wait_secs = wait, "backoff window active, waiting");
                tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            }

            match call().await {
                Ok(value) => {
                    tracing::debug!(bucket = %bucket, attempt = attempt + 1, "chat API call succeeded");
                    return Ok(Some(value));
                }
                Err(ChatError::RateLimited {
                    retry_after,
                    global,
                }) => {
                    self.note_rate_limit(&bucket, retry_after, global);
                    metrics::record_rate_limited("transport");
                    if attempt >= self.policy.max_retries {
                        tracing::error!(bucket = %bucket, "rate limited and retry budget exhausted");
                        return Err(ChatError::RateLimited {
                            retry_after,
                            global,
                        });
                    }
                    let delay = self.delay(attempt, retry_after);
                    tracing::warn!(
                        bucket = %bucket,
                        delay_secs = delay,
                        attempt = attempt + 1,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                }
                Err(err @ (ChatError::Server(_) | ChatError::Network(_))) => {
                    if attempt >= self.policy.max_retries {
                        tracing::error!(bucket = %bucket, error = %err, "retry budget exhausted");
                        return Err(err);
                    }
                    let delay = self.delay(attempt, None);
                    tracing::warn!(
                        bucket = %bucket,
                        error = %err,
                        delay_secs = delay,
                        attempt = attempt + 1,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                }
                Err(err) => {
                    // Client/validation and unclassified errors never retry.
                    tracing::error!(bucket = %bucket, error = %err, "permanent transport failure");
                    return Err(err);
                }
            }
        }

        Ok(None)
    }

    /// Send one message through [`execute`](Self::execute).
    pub async fn send_message(
        &self,
        transport: &dyn ChatTransport,
        destination_id: u64,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> Result<Option<MessageRef>, ChatError> {
        let endpoint = format!("destinations/{destination_id}/messages");
        self.execute(
            || transport.send(destination_id, content, attachment),
            &endpoint,
            "POST",
        )
        .await
    }

    /// Edit one message through [`execute`](Self::execute).
    pub async fn edit_message(
        &self,
        transport: &dyn ChatTransport,
        message: &MessageRef,
        content: &str,
    ) -> Result<Option<MessageRef>, ChatError> {
        let endpoint = format!(
            "destinations/{}/messages/{}",
            message.destination_id, message.message_id
        );
        self.execute(|| transport.edit(message, content), &endpoint, "PATCH")
            .await
    }

    /// Delete one message. Reports success as a boolean and never propagates.
    pub async fn delete_message(&self, transport: &dyn ChatTransport, message: &MessageRef) -> bool {
        let endpoint = format!(
            "destinations/{}/messages/{}",
            message.destination_id, message.message_id
        );
        match self
            .execute(|| transport.delete(message), &endpoint, "DELETE")
            .await
        {
            Ok(Some(())) => true,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "message delete failed");
                false
            }
        }
    }

    /// Current backoff windows. Expired entries are purged as a side effect.
    pub fn backoff_info(&self) -> BackoffInfo {
        let mut state = self.state.lock().expect("backoff state mutex poisoned");
        let now = epoch_secs();

        state.buckets.retain(|_, reset_at| *reset_at > now);
        if state.global_reset_at.is_some_and(|t| t <= now) {
            state.global_reset_at = None;
        }

        let mut active_buckets: Vec<String> = state.buckets.keys().cloned().collect();
        active_buckets.sort();

        BackoffInfo {
            global_limited: state.global_reset_at.is_some(),
            global_reset_in: state
                .global_reset_at
                .map(|t| (t - now).max(0.0))
                .unwrap_or(0.0),
            active_buckets,
        }
    }

    /// Seconds left on the later of the global and bucket windows.
    fn active_backoff(&self, bucket: &str) -> f64 {
        let state = self.state.lock().expect("backoff state mutex poisoned");
        let now = epoch_secs();
        let global = state.global_reset_at.map(|t| t - now).unwrap_or(0.0);
        let bucket = state.buckets.get(bucket).map(|t| t - now).unwrap_or(0.0);
        global.max(bucket).max(0.0)
    }

    /// Record a rate-limit signal into the backoff windows.
    fn note_rate_limit(&self, bucket: &str, retry_after: Option<f64>, global: bool) {
        let Some(retry_after) = retry_after else {
            return;
        };
        let mut state = self.state.lock().expect("backoff state mutex poisoned");
        let reset_at = epoch_secs() + retry_after;
        if global {
            state.global_reset_at = Some(reset_at);
            tracing::warn!(retry_after_secs = retry_after, "global rate limit hit");
        } else {
            state.buckets.insert(bucket.to_string(), reset_at);
            tracing::debug!(bucket = %bucket, retry_after_secs = retry_after, "bucket backoff window set");
        }
    }

    fn delay(&self, attempt: u32, hint: Option<f64>) -> f64 {
        let delay = hint.unwrap_or_else(|| {
            retry_delay(
                attempt,
                self.policy.base_delay_secs,
                self.policy.backoff_factor,
                self.policy.max_delay_secs,
            )
        });
        self.jitter.apply(delay)
    }
}
