//! Chat delivery subsystem.
//!
//! # Data Flow
//! ```text
//! Watcher / DeliveryQueue
//!     → resilience::TransportLimiter (backoff windows, classified retry)
//!     → ChatTransport::send (transport.rs)
//!     → WebhookTransport (webhook.rs, HTTP POST)
//!     → ChatError classified from the HTTP response
//! ```
//!
//! The transport is a trait so the queue and watcher never see HTTP types;
//! tests substitute a scripted transport.

pub mod transport;
pub mod webhook;

pub use transport::{Attachment, ChatError, ChatTransport, MessageRef};
pub use webhook::WebhookTransport;
