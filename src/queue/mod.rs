//! Persistent notification delivery queue.
//!
//! # Data Flow
//! ```text
//! enqueue (watcher fallback, callers)
//!     → dedupe check → priority insert → size cap → persist
//!
//! Background cycle (delivery.rs):
//!     skip if chat-api Failed (health)
//!     → sweep expired
//!     → batch of eligible Pending, queue order
//!     → TransportLimiter::send_message per message
//!     → Delivered (removed) | Pending again (backoff) | Failed (removed)
//!     → persist, stats, health reports
//!
//! Persistence (persistence.rs):
//!     full live set + stats as one document
//!     → temp file, then atomic rename
//! ```

pub mod delivery;
pub mod message;
pub mod persistence;

pub use delivery::{DeliveryQueue, NewMessage, QueueStatus};
pub use message::{MessagePriority, MessageStatus, QueuedMessage};
pub use persistence::QueueStats;
