//! Queued message records and their per-message state machine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notify::Attachment;

/// Retry delay base in seconds; doubles per retry.
const RETRY_BASE_SECS: f64 = 60.0;
/// Retry delay ceiling in seconds.
const RETRY_MAX_SECS: f64 = 3600.0;

/// Message priority. Higher sorts earlier in the queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Critical,
}

impl MessagePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePriority::Low => "low",
            MessagePriority::Normal => "normal",
            MessagePriority::High => "high",
            MessagePriority::Critical => "critical",
        }
    }
}

/// Processing state of a queued message.
///
/// `Expired` is a display state: expired-but-unswept Pending messages render
/// as Expired without being mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processing,
    Delivered,
    Failed,
    Expired,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
            MessageStatus::Expired => "expired",
        }
    }
}

/// What to do with a message after a delivery failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureDisposition {
    /// Back to Pending, rescheduled for the contained epoch time.
    Retry { scheduled_at: f64 },
    /// Out of retries or expired; remove from the live set.
    Permanent,
}

/// One queued notification. Timestamps are epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub destination_id: u64,
    pub content: String,
    pub priority: MessagePriority,
    pub created_at: f64,
    pub scheduled_at: Option<f64>,
    pub status: MessageStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub expires_at: Option<f64>,
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub dedupe_key: Option<String>,
    pub last_error: Option<String>,
}

impl QueuedMessage {
    /// True when the message is past its expiry time.
    pub fn is_expired(&self, now: f64) -> bool {
        self.expires_at.is_some_and(|t| now > t)
    }

    /// True when the message is eligible for delivery right now.
    pub fn can_send_now(&self, now: f64) -> bool {
        self.scheduled_at.is_none_or(|t| now >= t)
    }

    /// True when a failed message still has retry budget and lifetime left.
    pub fn should_retry(&self, now: f64) -> bool {
        self.retry_count < self.max_retries && !self.is_expired(now)
    }

    /// Status for display: expired-but-unswept Pending shows as Expired.
    pub fn display_status(&self, now: f64) -> MessageStatus {
        if self.status == MessageStatus::Pending && self.is_expired(now) {
            MessageStatus::Expired
        } else {
            self.status
        }
    }

    /// Apply a delivery failure: bump the retry count, record the error, and
    /// either reschedule with exponential backoff or give up.
    ///
    /// Permanent transport errors skip the retry path entirely.
    pub fn note_failure(&mut self, error: &str, transient: bool, now: f64) -> FailureDisposition {
        self.retry_count += 1;
        self.last_error = Some(error.to_string());

        if transient && self.should_retry(now) {
            let delay = (RETRY_BASE_SECS * 2f64.powi(self.retry_count as i32)).min(RETRY_MAX_SECS);
            let scheduled_at = now + delay;
            self.status = MessageStatus::Pending;
            self.scheduled_at = Some(scheduled_at);
            FailureDisposition::Retry { scheduled_at }
        } else {
            self.status = MessageStatus::Failed;
            FailureDisposition::Permanent
        }
    }
}

/// Sort key for the live queue: priority descending, then oldest first.
pub fn queue_order(a: &QueuedMessage, b: &QueuedMessage) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.created_at.total_cmp(&b.created_at))
}

/// Sort key for cap eviction: lowest priority first, newest-within-tier first.
pub fn eviction_order(a: &QueuedMessage, b: &QueuedMessage) -> std::cmp::Ordering {
    a.priority
        .cmp(&b.priority)
        .then(b.created_at.total_cmp(&a.created_at))
}
