//! Health monitoring and graceful degradation.
//!
//! # Data Flow
//! ```text
//! Collaborators (watcher, queue, persistence):
//!     record_success / record_failure
//!     → per-dependency state machine (state.rs)
//!     → system-wide evaluation (monitor.rs)
//!     → DegradationLevel + profile (degradation.rs)
//!
//! Everything else:
//!     adjusted_interval / adjusted_retry_count / feature_enabled
//!     → scaled by the current profile
//! ```
//!
//! # State Transitions
//! ```text
//! Unknown → Healthy: first success
//! Healthy → Degraded: failure_count >= 2
//! Degraded → Failed: failure_count >= 5
//! Failed → Degraded: next success
//! Degraded → Healthy: 3 consecutive successes since entering Degraded
//! ```

pub mod degradation;
pub mod monitor;
pub mod state;

pub use degradation::{DegradationProfile, DegradationTransition};
pub use monitor::{HealthMonitor, HealthSnapshot};
pub use state::{DegradationLevel, DependencyHealth, DependencyStatus};
