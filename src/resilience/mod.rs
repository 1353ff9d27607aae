//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller-triggered check:
//!     → admission.rs (sliding-window call cap, skip when over budget)
//!
//! Outbound chat API call:
//!     → protocol.rs (respect global/bucket backoff windows)
//!     → On transient failure: backoff.rs (jittered exponential delay), retry
//!     → On client/validation failure: propagate immediately
//! ```
//!
//! The two limiters are independent layers: the admission limiter caps how
//! often the system acts at all, the transport limiter paces the calls that
//! do go out against the platform's rate-limit signals.

pub mod admission;
pub mod backoff;
pub mod protocol;

pub use admission::AdmissionLimiter;
pub use backoff::{Jitter, NoJitter, UniformJitter};
pub use protocol::{BackoffInfo, BackoffPolicy, TransportLimiter};
