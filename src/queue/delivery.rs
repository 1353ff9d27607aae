//! Delivery queue driver.
//!
//! # Responsibilities
//! - Accept, deduplicate and priority-order queued notifications
//! - Enforce the size cap (keep higher-priority, then older, messages)
//! - Drive the background delivery cycle against the transport limiter
//! - Persist every mutation synchronously (see persistence.rs)
//!
//! One failure never blocks the rest of a batch, and a persistence failure
//! never aborts the in-memory operation that triggered it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::epoch_secs;
use crate::config::QueueConfig;
use crate::health::{DependencyStatus, HealthMonitor};
use crate::lifecycle::Shutdown;
use crate::notify::{Attachment, ChatError, ChatTransport, MessageRef};
use crate::observability::metrics;
use crate::queue::message::{
    eviction_order, queue_order, FailureDisposition, MessagePriority, MessageStatus, QueuedMessage,
};
use crate::queue::persistence::{self, QueueStats};
use crate::resilience::TransportLimiter;

/// Health dependency name for delivery outcomes.
const CHAT_DEPENDENCY: &str = "chat-api";
/// Health dependency name for persistence outcomes.
const STORAGE_DEPENDENCY: &str = "storage";

/// Parameters for a message being enqueued.
pub struct NewMessage {
    destination_id: u64,
    content: String,
    priority: MessagePriority,
    delay_secs: Option<f64>,
    ttl_secs: Option<f64>,
    attachment: Option<Attachment>,
    tags: Vec<String>,
    dedupe_key: Option<String>,
    max_retries: u32,
}

impl NewMessage {
    pub fn new(destination_id: u64, content: impl Into<String>) -> Self {
        Self {
            destination_id,
            content: content.into(),
            priority: MessagePriority::Normal,
            delay_secs: None,
            ttl_secs: None,
            attachment: None,
            tags: Vec::new(),
            dedupe_key: None,
            max_retries: 3,
        }
    }

    pub fn priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Delay before the message becomes eligible for delivery.
    pub fn delay_secs(mut self, delay: f64) -> Self {
        self.delay_secs = Some(delay);
        self
    }

    /// Lifetime override; without one the queue's default max age applies.
    pub fn ttl_secs(mut self, ttl: f64) -> Self {
        self.ttl_secs = Some(ttl);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Coalesce logically-identical pending notifications into one entry.
    pub fn dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn into_message(self, now: f64, default_max_age_secs: u64) -> QueuedMessage {
        let expires_at = self
            .ttl_secs
            .map(|ttl| now + ttl)
            .or_else(|| (default_max_age_secs > 0).then(|| now + default_max_age_secs as f64));

        QueuedMessage {
            id: Uuid::new_v4(),
            destination_id: self.destination_id,
            content: self.content,
            priority: self.priority,
            created_at: now,
            scheduled_at: self.delay_secs.map(|delay| now + delay),
            status: MessageStatus::Pending,
            retry_count: 0,
            max_retries: self.max_retries,
            expires_at,
            attachment: self.attachment,
            tags: self.tags,
            dedupe_key: self.dedupe_key,
            last_error: None,
        }
    }
}

struct QueueInner {
    messages: Vec<QueuedMessage>,
    dedupe: HashMap<String, Uuid>,
    stats: QueueStats,
}

/// Snapshot of queue state for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub is_processing: bool,
    pub ready_to_process: usize,
    pub scheduled_for_later: usize,
    pub status_breakdown: BTreeMap<&'static str, usize>,
    pub priority_breakdown: BTreeMap<&'static str, usize>,
    pub statistics: QueueStats,
    pub oldest_message_age_secs: f64,
    pub dedupe_index_size: usize,
}

/// Persistent, priority-ordered, deduplicating delivery queue.
pub struct DeliveryQueue {
    config: QueueConfig,
    transport: Arc<dyn ChatTransport>,
    limiter: Arc<TransportLimiter>,
    health: Arc<HealthMonitor>,
    inner: Mutex<QueueInner>,
    processing: AtomicBool,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryQueue {
    /// Create a queue, restoring any persisted live set.
    ///
    /// A failed load degrades to an empty queue rather than failing startup.
    pub fn new(
        config: QueueConfig,
        transport: Arc<dyn ChatTransport>,
        limiter: Arc<TransportLimiter>,
        health: Arc<HealthMonitor>,
    ) -> Self {
        let (mut messages, stats) = match persistence::load(&config.path) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::error!(error = %err, path = %config.path.display(), "failed to load queue, starting empty");
                (Vec::new(), QueueStats::default())
            }
        };
        messages.sort_by(queue_order);

        // Rebuild the dedupe index from surviving records.
        let mut dedupe = HashMap::new();
        for message in &messages {
            if let Some(key) = &message.dedupe_key {
                dedupe.insert(key.clone(), message.id);
            }
        }

        Self {
            config,
            transport,
            limiter,
            health,
            inner: Mutex::new(QueueInner {
                messages,
                dedupe,
                stats,
            }),
            processing: AtomicBool::new(false),
            worker: std::sync::Mutex::new(None),
        }
    }

    /// Add a message to the queue.
    ///
    /// Returns the existing id when the dedupe key already maps to a live
    /// message. Always succeeds in memory; persistence is best-effort.
    pub async fn enqueue(&self, new: NewMessage) -> Uuid {
        let mut inner = self.inner.lock().await;

        if let Some(key) = &new.dedupe_key {
            if let Some(existing) = inner.dedupe.get(key).copied() {
                inner.stats.total_deduplicated += 1;
                metrics::record_dedupe_hit();
                tracing::debug!(dedupe_key = %key, id = %existing, "message deduplicated");
                return existing;
            }
        }

        let now = epoch_secs();
        let message = new.into_message(now, self.config.max_message_age_secs);
        let id = message.id;
        let priority = message.priority;

        if let Some(key) = &message.dedupe_key {
            inner.dedupe.insert(key.clone(), id);
        }
        inner.messages.push(message);
        inner.messages.sort_by(queue_order);
        self.enforce_size_cap(&mut inner);
        inner.stats.total_queued += 1;
        self.persist(&inner);

        tracing::debug!(id = %id, priority = priority.as_str(), "message queued");
        id
    }

    /// Start the background processing cycle. No-op when already started.
    pub fn start(self: &Arc<Self>, shutdown: &Shutdown) {
        let mut worker = self.worker.lock().expect("queue worker mutex poisoned");
        if worker.is_some() {
            return;
        }

        self.processing.store(true, Ordering::SeqCst);
        let queue = Arc::clone(self);
        let mut shutdown_rx = shutdown.subscribe();

        *worker = Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs_f64(queue.config.process_interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        queue.process_once().await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("queue processing received shutdown signal");
                        break;
                    }
                }
            }
        }));
        tracing::info!("queue processing started");
    }

    /// Stop the background cycle. Idempotent; safe during runtime teardown.
    ///
    /// Nothing is flushed here: every mutation already persisted.
    pub fn stop(&self) {
        self.processing.store(false, Ordering::SeqCst);
        let handle = self.worker.lock().expect("queue worker mutex poisoned").take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("queue processing stopped");
        }
    }

    /// Run one processing cycle: sweep expiries, deliver one batch.
    ///
    /// Returns the number of messages attempted.
    pub async fn process_once(&self) -> usize {
        if self.health.dependency_status(CHAT_DEPENDENCY) == Some(DependencyStatus::Failed) {
            tracing::debug!("chat API marked failed, skipping queue processing");
            return 0;
        }

        let now = epoch_secs();
        let batch: Vec<QueuedMessage> = {
            let mut inner = self.inner.lock().await;
            if Self::sweep_expired(&mut inner, now) > 0 {
                self.persist(&inner);
            }

            let batch_size = self.config.batch_size;
            let mut batch = Vec::new();
            for message in inner.messages.iter_mut() {
                if batch.len() >= batch_size {
                    break;
                }
                if message.status == MessageStatus::Pending
                    && message.can_send_now(now)
                    && !message.is_expired(now)
                {
                    message.status = MessageStatus::Processing;
                    batch.push(message.clone());
                }
            }
            batch
        };

        if batch.is_empty() {
            return 0;
        }
        tracing::debug!(count = batch.len(), "processing delivery batch");

        for message in &batch {
            let outcome = self
                .limiter
                .send_message(
                    self.transport.as_ref(),
                    message.destination_id,
                    &message.content,
                    message.attachment.as_ref(),
                )
                .await;
            self.apply_outcome(message.id, outcome).await;
        }
        batch.len()
    }

    /// Snapshot for status reporting.
    pub async fn status(&self) -> QueueStatus {
        let inner = self.inner.lock().await;
        let now = epoch_secs();

        let mut status_breakdown: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut priority_breakdown: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut ready = 0;
        let mut scheduled = 0;
        let mut oldest: Option<f64> = None;

        for message in &inner.messages {
            *status_breakdown
                .entry(message.display_status(now).as_str())
                .or_default() += 1;
            *priority_breakdown
                .entry(message.priority.as_str())
                .or_default() += 1;

            if message.status == MessageStatus::Pending && !message.is_expired(now) {
                if message.can_send_now(now) {
                    ready += 1;
                } else {
                    scheduled += 1;
                }
            }
            oldest = Some(oldest.map_or(message.created_at, |o: f64| o.min(message.created_at)));
        }

        QueueStatus {
            queue_size: inner.messages.len(),
            max_queue_size: self.config.max_size,
            is_processing: self.processing.load(Ordering::SeqCst),
            ready_to_process: ready,
            scheduled_for_later: scheduled,
            status_breakdown,
            priority_breakdown,
            statistics: inner.stats.clone(),
            oldest_message_age_secs: oldest.map(|o| (now - o).max(0.0)).unwrap_or(0.0),
            dedupe_index_size: inner.dedupe.len(),
        }
    }

    /// Remove all messages, or only one priority tier. Returns count removed.
    pub async fn clear(&self, priority: Option<MessagePriority>) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.messages.len();

        match priority {
            None => {
                inner.messages.clear();
                inner.dedupe.clear();
            }
            Some(priority) => {
                let mut removed_keys = Vec::new();
                inner.messages.retain(|message| {
                    if message.priority == priority {
                        if let Some(key) = &message.dedupe_key {
                            removed_keys.push(key.clone());
                        }
                        false
                    } else {
                        true
                    }
                });
                for key in removed_keys {
                    inner.dedupe.remove(&key);
                }
            }
        }

        let removed = before - inner.messages.len();
        self.persist(&inner);
        tracing::info!(removed, "cleared queued messages");
        removed
    }

    /// Force eligible Failed messages back to Pending, scheduled immediately.
    pub async fn retry_failed(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let now = epoch_secs();
        let mut count = 0;

        for message in inner.messages.iter_mut() {
            if message.status == MessageStatus::Failed && message.should_retry(now) {
                message.status = MessageStatus::Pending;
                message.scheduled_at = Some(now);
                count += 1;
            }
        }

        if count > 0 {
            inner.messages.sort_by(queue_order);
            self.persist(&inner);
            tracing::info!(count, "rescheduled failed messages for retry");
        }
        count
    }

    /// Look up a live message by id.
    pub async fn message(&self, id: Uuid) -> Option<QueuedMessage> {
        self.inner
            .lock()
            .await
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    async fn apply_outcome(&self, id: Uuid, outcome: Result<Option<MessageRef>, ChatError>) {
        let now = epoch_secs();
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.messages.iter().position(|m| m.id == id) else {
            return;
        };

        match outcome {
            Ok(Some(_)) => {
                inner.messages[pos].status = MessageStatus::Delivered;
                let message = inner.messages.remove(pos);
                if let Some(key) = &message.dedupe_key {
                    inner.dedupe.remove(key);
                }
                inner.stats.total_delivered += 1;
                metrics::record_delivery("delivered");
                self.health.record_success(CHAT_DEPENDENCY, Some("queue_delivery"));
                tracing::debug!(id = %id, "message delivered");
            }
            Ok(None) => {
                self.fail_message(&mut inner, pos, "retry budget exhausted", true, now);
            }
            Err(err) => {
                let transient = err.is_transient();
                self.fail_message(&mut inner, pos, &err.to_string(), transient, now);
            }
        }
        self.persist(&inner);
    }

    fn fail_message(
        &self,
        inner: &mut QueueInner,
        pos: usize,
        error: &str,
        transient: bool,
        now: f64,
    ) {
        let id = inner.messages[pos].id;
        self.health
            .record_failure(CHAT_DEPENDENCY, error, Some("queue_delivery"));

        match inner.messages[pos].note_failure(error, transient, now) {
            FailureDisposition::Retry { scheduled_at } => {
                tracing::warn!(
                    id = %id,
                    error,
                    retry_in_secs = scheduled_at - now,
                    "delivery failed, retry scheduled"
                );
                inner.messages.sort_by(queue_order);
            }
            FailureDisposition::Permanent => {
                let message = inner.messages.remove(pos);
                if let Some(key) = &message.dedupe_key {
                    inner.dedupe.remove(key);
                }
                inner.stats.total_failed += 1;
                metrics::record_delivery("failed");
                tracing::error!(
                    id = %id,
                    error,
                    retries = message.retry_count,
                    "message failed permanently"
                );
            }
        }
    }

    /// Drop expired messages, keeping the dedupe index in lockstep.
    fn sweep_expired(inner: &mut QueueInner, now: f64) -> usize {
        let before = inner.messages.len();
        let mut removed_keys = Vec::new();
        inner.messages.retain(|message| {
            if message.is_expired(now) {
                if let Some(key) = &message.dedupe_key {
                    removed_keys.push(key.clone());
                }
                false
            } else {
                true
            }
        });
        for key in removed_keys {
            inner.dedupe.remove(&key);
        }

        let swept = before - inner.messages.len();
        if swept > 0 {
            inner.stats.total_expired += swept as u64;
            metrics::record_expired(swept as u64);
            tracing::debug!(count = swept, "swept expired messages");
        }
        swept
    }

    /// Evict from the lowest tier (newest first) until within the cap.
    fn enforce_size_cap(&self, inner: &mut QueueInner) {
        if inner.messages.len() <= self.config.max_size {
            return;
        }
        let excess = inner.messages.len() - self.config.max_size;

        let mut candidates: Vec<(Uuid, Option<String>)> = {
            let mut by_eviction: Vec<&QueuedMessage> = inner.messages.iter().collect();
            by_eviction.sort_by(|a, b| eviction_order(a, b));
            by_eviction
                .iter()
                .take(excess)
                .map(|m| (m.id, m.dedupe_key.clone()))
                .collect()
        };

        for (id, dedupe_key) in candidates.drain(..) {
            inner.messages.retain(|m| m.id != id);
            if let Some(key) = dedupe_key {
                inner.dedupe.remove(&key);
            }
        }

        metrics::record_eviction(excess as u64);
        tracing::warn!(count = excess, "evicted messages over queue size cap");
    }

    fn persist(&self, inner: &QueueInner) {
        match persistence::save(
            Path::new(&self.config.path),
            &inner.messages,
            &inner.stats,
        ) {
            Ok(()) => {
                self.health.record_success(STORAGE_DEPENDENCY, Some("queue_save"));
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to persist queue");
                self.health
                    .record_failure(STORAGE_DEPENDENCY, &err.to_string(), Some("queue_save"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{BackoffPolicy, NoJitter};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        outcomes: std::sync::Mutex<VecDeque<Result<(), ChatError>>>,
    }

    impl ScriptedTransport {
        fn always_ok() -> Self {
            Self {
                outcomes: std::sync::Mutex::new(VecDeque::new()),
            }
        }

        fn with_outcomes(outcomes: Vec<Result<(), ChatError>>) -> Self {
            Self {
                outcomes: std::sync::Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(
            &self,
            destination_id: u64,
            _content: &str,
            _attachment: Option<&Attachment>,
        ) -> Result<MessageRef, ChatError> {
            let next = self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
            next.map(|_| MessageRef {
                destination_id,
                message_id: Uuid::new_v4().to_string(),
            })
        }

        async fn edit(
            &self,
            message: &MessageRef,
            _content: &str,
        ) -> Result<MessageRef, ChatError> {
            Ok(message.clone())
        }

        async fn delete(&self, _message: &MessageRef) -> Result<(), ChatError> {
            Ok(())
        }
    }

    fn queue_with(
        dir: &tempfile::TempDir,
        max_size: usize,
        transport: ScriptedTransport,
    ) -> (Arc<DeliveryQueue>, Arc<HealthMonitor>) {
        let health = Arc::new(HealthMonitor::new());
        health.register(CHAT_DEPENDENCY, HashMap::new());
        health.register(STORAGE_DEPENDENCY, HashMap::new());

        let limiter = Arc::new(TransportLimiter::with_jitter(
            BackoffPolicy {
                max_retries: 0,
                base_delay_secs: 0.01,
                max_delay_secs: 0.01,
                backoff_factor: 1.0,
            },
            Box::new(NoJitter),
        ));

        let config = QueueConfig {
            path: dir.path().join("queue.json"),
            max_size,
            max_message_age_secs: 3600,
            batch_size: 5,
            process_interval_secs: 1.0,
        };
        let queue = Arc::new(DeliveryQueue::new(
            config,
            Arc::new(transport),
            limiter,
            health.clone(),
        ));
        (queue, health)
    }

    #[tokio::test]
    async fn test_dedupe_returns_existing_id() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _) = queue_with(&dir, 100, ScriptedTransport::always_ok());

        let first = queue
            .enqueue(NewMessage::new(1, "IP changed").dedupe_key("k1"))
            .await;
        let second = queue
            .enqueue(NewMessage::new(1, "IP changed").dedupe_key("k1"))
            .await;

        assert_eq!(first, second);
        let status = queue.status().await;
        assert_eq!(status.queue_size, 1);
        assert_eq!(status.statistics.total_deduplicated, 1);
        assert_eq!(status.statistics.total_queued, 1);
    }

    #[tokio::test]
    async fn test_size_cap_keeps_higher_priority() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _) = queue_with(&dir, 3, ScriptedTransport::always_ok());

        queue
            .enqueue(NewMessage::new(1, "critical").priority(MessagePriority::Critical))
            .await;
        for i in 0..4 {
            queue
                .enqueue(NewMessage::new(1, format!("low {i}")).priority(MessagePriority::Low))
                .await;
        }

        let status = queue.status().await;
        assert_eq!(status.queue_size, 3);
        assert_eq!(status.priority_breakdown.get("critical"), Some(&1));
        assert_eq!(status.priority_breakdown.get("low"), Some(&2));
    }

    #[tokio::test]
    async fn test_eviction_drops_newest_within_tier() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _) = queue_with(&dir, 2, ScriptedTransport::always_ok());

        let oldest = queue.enqueue(NewMessage::new(1, "low 0")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let middle = queue.enqueue(NewMessage::new(1, "low 1")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newest = queue.enqueue(NewMessage::new(1, "low 2")).await;

        assert!(queue.message(oldest).await.is_some());
        assert!(queue.message(middle).await.is_some());
        assert!(queue.message(newest).await.is_none());
    }

    #[tokio::test]
    async fn test_delivery_success_removes_message() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, health) = queue_with(&dir, 100, ScriptedTransport::always_ok());

        queue.enqueue(NewMessage::new(1, "hello")).await;
        let attempted = queue.process_once().await;

        assert_eq!(attempted, 1);
        let status = queue.status().await;
        assert_eq!(status.queue_size, 0);
        assert_eq!(status.statistics.total_delivered, 1);
        assert_eq!(status.dedupe_index_size, 0);
        assert_eq!(
            health.dependency_status(CHAT_DEPENDENCY),
            Some(DependencyStatus::Healthy)
        );
    }

    #[tokio::test]
    async fn test_transient_failure_schedules_retry() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            ScriptedTransport::with_outcomes(vec![Err(ChatError::Server(502))]);
        let (queue, _) = queue_with(&dir, 100, transport);

        let id = queue.enqueue(NewMessage::new(1, "hello")).await;
        queue.process_once().await;

        let message = queue.message(id).await.expect("message should remain");
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(message.retry_count, 1);
        let scheduled_at = message.scheduled_at.expect("retry must be scheduled");
        assert!(scheduled_at > epoch_secs() + 100.0);
    }

    #[tokio::test]
    async fn test_permanent_failure_removes_message() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            ScriptedTransport::with_outcomes(vec![Err(ChatError::Client(400))]);
        let (queue, _) = queue_with(&dir, 100, transport);

        queue.enqueue(NewMessage::new(1, "hello")).await;
        queue.process_once().await;

        let status = queue.status().await;
        assert_eq!(status.queue_size, 0);
        assert_eq!(status.statistics.total_failed, 1);
    }

    #[tokio::test]
    async fn test_processing_skipped_when_chat_api_failed() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, health) = queue_with(&dir, 100, ScriptedTransport::always_ok());

        for _ in 0..5 {
            health.record_failure(CHAT_DEPENDENCY, "down", None);
        }
        queue.enqueue(NewMessage::new(1, "held back")).await;

        assert_eq!(queue.process_once().await, 0);
        assert_eq!(queue.status().await.queue_size, 1);
    }

    #[tokio::test]
    async fn test_expired_message_swept_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _) = queue_with(&dir, 100, ScriptedTransport::always_ok());

        queue
            .enqueue(NewMessage::new(1, "stale").ttl_secs(0.001))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.process_once().await;

        let status = queue.status().await;
        assert_eq!(status.queue_size, 0);
        assert_eq!(status.statistics.total_expired, 1);
        assert_eq!(status.statistics.total_delivered, 0);
    }

    #[tokio::test]
    async fn test_delayed_message_waits_for_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _) = queue_with(&dir, 100, ScriptedTransport::always_ok());

        queue
            .enqueue(NewMessage::new(1, "later").delay_secs(3600.0))
            .await;

        let status = queue.status().await;
        assert_eq!(status.ready_to_process, 0);
        assert_eq!(status.scheduled_for_later, 1);
        assert_eq!(queue.process_once().await, 0);
    }

    #[tokio::test]
    async fn test_clear_by_priority() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, _) = queue_with(&dir, 100, ScriptedTransport::always_ok());

        queue
            .enqueue(NewMessage::new(1, "a").priority(MessagePriority::Low))
            .await;
        queue
            .enqueue(NewMessage::new(1, "b").priority(MessagePriority::High))
            .await;

        assert_eq!(queue.clear(Some(MessagePriority::Low)).await, 1);
        assert_eq!(queue.status().await.queue_size, 1);
        assert_eq!(queue.clear(None).await, 1);
        assert_eq!(queue.status().await.queue_size, 0);
    }

    #[tokio::test]
    async fn test_queue_restored_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (queue, _) = queue_with(&dir, 100, ScriptedTransport::always_ok());
            queue
                .enqueue(NewMessage::new(1, "persisted").dedupe_key("restart"))
                .await;
        }

        let (queue, _) = queue_with(&dir, 100, ScriptedTransport::always_ok());
        let status = queue.status().await;
        assert_eq!(status.queue_size, 1);
        assert_eq!(status.dedupe_index_size, 1);
        // Dedupe still applies after restart.
        let before = status.statistics.total_queued;
        queue
            .enqueue(NewMessage::new(1, "persisted").dedupe_key("restart"))
            .await;
        let status = queue.status().await;
        assert_eq!(status.queue_size, 1);
        assert_eq!(status.statistics.total_queued, before);
    }
}
