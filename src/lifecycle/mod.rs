//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize subsystems → Spawn tickers
//!
//! Scheduler (scheduler.rs):
//!     readiness gate → sleep(interval_of()) → tick() → on_error policy
//!     shutdown signal wins every select
//!
//! Shutdown (shutdown.rs):
//!     SIGINT → broadcast → tickers and queue worker exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then background tasks
//! - The interval is re-queried every lap so degradation-scaled cadence
//!   takes effect without restarting the ticker

pub mod scheduler;
pub mod shutdown;

pub use scheduler::{run_ticker, TickPolicy};
pub use shutdown::Shutdown;
