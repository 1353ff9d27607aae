//! Per-dependency health records and the system degradation scale.

use std::collections::HashMap;

use serde::Serialize;

/// Health status of a single tracked dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Unknown,
    Healthy,
    Degraded,
    Failed,
}

/// System-wide degradation tier, ordered from fully operational to minimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradationLevel {
    Normal,
    Minor,
    Moderate,
    Severe,
    Critical,
}

impl DegradationLevel {
    /// Wire/display name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationLevel::Normal => "normal",
            DegradationLevel::Minor => "minor",
            DegradationLevel::Moderate => "moderate",
            DegradationLevel::Severe => "severe",
            DegradationLevel::Critical => "critical",
        }
    }
}

/// Health record for one dependency.
///
/// Created at registration, mutated only by record_success/record_failure,
/// never deleted (only reset).
#[derive(Debug, Clone)]
pub struct DependencyHealth {
    pub name: String,
    pub status: DependencyStatus,
    pub last_success_ts: Option<f64>,
    pub last_failure_ts: Option<f64>,
    pub failure_count: u32,
    pub success_count: u64,
    /// Successes since the last failure. Drives Degraded → Healthy recovery;
    /// deliberately separate from the lifetime `success_count`.
    pub consecutive_successes: u32,
    pub last_error: Option<String>,
    pub degraded_since_ts: Option<f64>,
    pub capabilities: HashMap<String, bool>,
}

impl DependencyHealth {
    pub fn new(name: impl Into<String>, capabilities: HashMap<String, bool>) -> Self {
        Self {
            name: name.into(),
            status: DependencyStatus::Unknown,
            last_success_ts: None,
            last_failure_ts: None,
            failure_count: 0,
            success_count: 0,
            consecutive_successes: 0,
            last_error: None,
            degraded_since_ts: None,
            capabilities,
        }
    }

    /// Zero the record back to its freshly-registered state.
    pub fn reset(&mut self) {
        self.status = DependencyStatus::Unknown;
        self.last_success_ts = None;
        self.last_failure_ts = None;
        self.failure_count = 0;
        self.success_count = 0;
        self.consecutive_successes = 0;
        self.last_error = None;
        self.degraded_since_ts = None;
    }
}
