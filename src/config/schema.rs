//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resilience::BackoffPolicy;

/// Root configuration for the IP monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Public IP polling settings.
    pub watch: WatchConfig,

    /// Chat notification transport settings.
    pub notify: NotifyConfig,

    /// Delivery queue settings.
    pub queue: QueueConfig,

    /// Outbound-notification admission window.
    pub admission: AdmissionConfig,

    /// Transport retry and backoff shape.
    pub backoff: BackoffConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Public IP polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Primary IP lookup endpoint. Must return the address as plain text.
    pub source_url: String,

    /// Fallback endpoints tried in order when the primary fails.
    #[serde(default)]
    pub fallback_urls: Vec<String>,

    /// Base polling interval in seconds; scaled up under degradation.
    pub interval_secs: u64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Where the last observed address is persisted across restarts.
    pub state_path: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source_url: "https://api.ipify.org".to_string(),
            fallback_urls: vec![
                "https://ifconfig.me/ip".to_string(),
                "https://icanhazip.com".to_string(),
            ],
            interval_secs: 300,
            timeout_secs: 10,
            state_path: PathBuf::from("ip_state.json"),
        }
    }
}

/// Chat notification transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Chat API base URL.
    pub base_url: String,

    /// Destination (channel) that receives change notifications.
    pub destination_id: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            destination_id: 0,
            request_timeout_secs: 15,
        }
    }
}

/// Delivery queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Persistence file for the live set and stats.
    pub path: PathBuf,

    /// Hard cap on live messages; lowest-value entries are evicted over it.
    pub max_size: usize,

    /// Default message lifetime in seconds (0 disables the default expiry).
    pub max_message_age_secs: u64,

    /// Messages attempted per processing cycle.
    pub batch_size: usize,

    /// Seconds between processing cycles.
    pub process_interval_secs: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("message_queue.json"),
            max_size: 1000,
            max_message_age_secs: 86_400,
            batch_size: 5,
            process_interval_secs: 1.0,
        }
    }
}

/// Sliding-window admission configuration for outbound notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum notifications admitted per window.
    pub max_calls: usize,

    /// Window length in seconds.
    pub period_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_calls: 30,
            period_secs: 60,
        }
    }
}

/// Transport retry and backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in seconds.
    pub base_delay_secs: f64,

    /// Maximum delay for exponential backoff in seconds.
    pub max_delay_secs: f64,

    /// Exponential growth factor.
    pub backoff_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 60.0,
            backoff_factor: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_retries: self.max_retries,
            base_delay_secs: self.base_delay_secs,
            max_delay_secs: self.max_delay_secs,
            backoff_factor: self.backoff_factor,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
