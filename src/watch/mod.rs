//! Public IP watching.
//!
//! # Data Flow
//! ```text
//! scheduler tick (lifecycle::run_ticker)
//!     → IpWatcher::tick
//!     → IpSource::fetch (source.rs, HTTP GET with in-order fallbacks)
//!     → health report for ip-source
//!     → compare with last observed address
//!     → on change: persist state, then
//!         notifications gated off? → log only
//!         admission window full?   → DeliveryQueue::enqueue (deduped)
//!         otherwise                → TransportLimiter::send_message,
//!                                    queue fallback on failure
//! ```

pub mod source;
pub mod watcher;

pub use source::{HttpIpSource, IpSource, SourceError};
pub use watcher::{IpWatcher, WatchError};
