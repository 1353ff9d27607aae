//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use ip_sentinel::config::QueueConfig;
use ip_sentinel::health::HealthMonitor;
use ip_sentinel::notify::{Attachment, ChatError, ChatTransport, MessageRef};
use ip_sentinel::queue::DeliveryQueue;
use ip_sentinel::resilience::{BackoffPolicy, NoJitter, TransportLimiter};

/// Chat transport driven by a script of outcomes; counts every call.
///
/// Once the script is exhausted every further call succeeds.
pub struct ProgrammableTransport {
    outcomes: Mutex<VecDeque<Result<(), ChatError>>>,
    calls: AtomicU32,
}

impl ProgrammableTransport {
    pub fn always_ok() -> Arc<Self> {
        Self::script(Vec::new())
    }

    pub fn script(outcomes: Vec<Result<(), ChatError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for ProgrammableTransport {
    async fn send(
        &self,
        destination_id: u64,
        _content: &str,
        _attachment: Option<&Attachment>,
    ) -> Result<MessageRef, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
        next.map(|_| MessageRef {
            destination_id,
            message_id: Uuid::new_v4().to_string(),
        })
    }

    async fn edit(&self, message: &MessageRef, _content: &str) -> Result<MessageRef, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(message.clone())
    }

    async fn delete(&self, _message: &MessageRef) -> Result<(), ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Health monitor with the standard dependency set registered.
pub fn standard_health() -> Arc<HealthMonitor> {
    let health = Arc::new(HealthMonitor::new());
    for name in ["ip-source", "chat-api", "storage", "admission-limiter"] {
        health.register(name, HashMap::new());
    }
    health
}

/// Transport limiter with no retries, no jitter and negligible delays, so
/// queue-level outcome handling is what the test observes.
pub fn passthrough_limiter() -> Arc<TransportLimiter> {
    Arc::new(TransportLimiter::with_jitter(
        BackoffPolicy {
            max_retries: 0,
            base_delay_secs: 0.001,
            max_delay_secs: 0.001,
            backoff_factor: 1.0,
        },
        Box::new(NoJitter),
    ))
}

/// Queue config persisting under the given temp dir.
pub fn queue_config(dir: &tempfile::TempDir) -> QueueConfig {
    QueueConfig {
        path: dir.path().join("queue.json"),
        ..Default::default()
    }
}

/// Fully wired queue over a programmable transport.
pub fn build_queue(
    config: QueueConfig,
    transport: Arc<ProgrammableTransport>,
    health: Arc<HealthMonitor>,
) -> Arc<DeliveryQueue> {
    Arc::new(DeliveryQueue::new(
        config,
        transport,
        passthrough_limiter(),
        health,
    ))
}
