//! IP Sentinel
//!
//! A public-IP change monitor: polls lookup endpoints on a health-scaled
//! cadence and announces address changes over a chat webhook, with a
//! persistent delivery queue behind the direct path.
//!
//! # Architecture Overview
//!
//! ```text
//!   scheduler tick                 direct path
//!  ┌───────────┐   ┌─────────┐   ┌───────────────────┐   ┌───────────┐
//!  │ lifecycle │──▶│  watch  │──▶│    resilience     │──▶│  notify   │
//!  │run_ticker │   │ watcher │   │admission+transport│   │ transport │
//!  └───────────┘   └────┬────┘   └───────────────────┘   └───────────┘
//!                       │ fallback                              ▲
//!                       ▼                                       │
//!                  ┌─────────┐      background cycle            │
//!                  │  queue  │──────────────────────────────────┘
//!                  │delivery │──▶ persistence (JSON, atomic)
//!                  └─────────┘
//!
//!  Cross-cutting: config, health (degradation levels), observability
//! ```

pub mod clock;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod queue;
pub mod resilience;
pub mod watch;

pub use config::AppConfig;
pub use health::HealthMonitor;
pub use lifecycle::Shutdown;
pub use queue::DeliveryQueue;
