//! Transport seam between the delivery pipeline and the chat platform.

use async_trait::async_trait;
use thiserror::Error;

/// Opaque attachment payload forwarded verbatim to the transport.
pub type Attachment = serde_json::Value;

/// Handle to a delivered message, usable for later edit/delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Destination the message was sent to.
    pub destination_id: u64,
    /// Platform-assigned message identifier.
    pub message_id: String,
}

/// Classified transport failure.
///
/// The taxonomy drives the retry decision in `resilience::TransportLimiter`:
/// `RateLimited`, `Server` and `Network` are transient; `Client` and `Other`
/// are permanent and never retried.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// The platform rejected the call with a rate-limit signal.
    #[error("rate limited (retry after {retry_after:?}s, global: {global})")]
    RateLimited {
        /// Server-provided wait hint in seconds, if any.
        retry_after: Option<f64>,
        /// Whether the limit applies globally rather than to one bucket.
        global: bool,
    },

    /// Server-side failure (5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Connection-level failure (connect, timeout, transfer abort).
    #[error("network error: {0}")]
    Network(String),

    /// Client/validation failure (4xx other than 429).
    #[error("client error: status {0}")]
    Client(u16),

    /// Anything unclassified. Treated as permanent to avoid retry loops on
    /// programming errors.
    #[error("unexpected transport error: {0}")]
    Other(String),
}

impl ChatError {
    /// True when a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChatError::RateLimited { .. } | ChatError::Server(_) | ChatError::Network(_)
        )
    }
}

/// Async capability to deliver content to a chat destination.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `content` (plus an optional attachment) to a destination.
    async fn send(
        &self,
        destination_id: u64,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> Result<MessageRef, ChatError>;

    /// Replace the content of a previously sent message.
    async fn edit(&self, message: &MessageRef, content: &str) -> Result<MessageRef, ChatError>;

    /// Delete a previously sent message.
    async fn delete(&self, message: &MessageRef) -> Result<(), ChatError>;
}
