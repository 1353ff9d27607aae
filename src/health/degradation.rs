//! Degradation profiles and the transition log entry type.

use serde::Serialize;

use crate::health::state::DegradationLevel;

/// Operational parameters for one degradation level.
#[derive(Debug, Clone, Serialize)]
pub struct DegradationProfile {
    pub description: &'static str,
    /// Multiplier applied to the base polling interval.
    pub interval_multiplier: f64,
    /// Multiplier applied to base retry counts.
    pub retry_multiplier: f64,
    pub notifications_enabled: bool,
    pub history_logging_enabled: bool,
    pub status_commands_enabled: bool,
    /// Fallback behaviors active at this level.
    pub active_fallbacks: &'static [&'static str],
}

/// Profile table entry for a level.
pub fn profile(level: DegradationLevel) -> &'static DegradationProfile {
    match level {
        DegradationLevel::Normal => &NORMAL,
        DegradationLevel::Minor => &MINOR,
        DegradationLevel::Moderate => &MODERATE,
        DegradationLevel::Severe => &SEVERE,
        DegradationLevel::Critical => &CRITICAL,
    }
}

static NORMAL: DegradationProfile = DegradationProfile {
    description: "all systems operational",
    interval_multiplier: 1.0,
    retry_multiplier: 1.0,
    notifications_enabled: true,
    history_logging_enabled: true,
    status_commands_enabled: true,
    active_fallbacks: &[],
};

static MINOR: DegradationProfile = DegradationProfile {
    description: "minor issues, full functionality maintained",
    interval_multiplier: 1.2,
    retry_multiplier: 1.0,
    notifications_enabled: true,
    history_logging_enabled: true,
    status_commands_enabled: true,
    active_fallbacks: &[],
};

static MODERATE: DegradationProfile = DegradationProfile {
    description: "some dependencies degraded, reduced functionality",
    interval_multiplier: 1.5,
    retry_multiplier: 1.5,
    notifications_enabled: true,
    history_logging_enabled: true,
    status_commands_enabled: true,
    active_fallbacks: &["cached-value", "extended-timeouts"],
};

static SEVERE: DegradationProfile = DegradationProfile {
    description: "multiple dependency failures, core functionality only",
    interval_multiplier: 2.0,
    retry_multiplier: 2.0,
    notifications_enabled: false,
    history_logging_enabled: true,
    status_commands_enabled: true,
    active_fallbacks: &[
        "cached-value",
        "extended-timeouts",
        "read-only",
        "silent-monitoring",
    ],
};

static CRITICAL: DegradationProfile = DegradationProfile {
    description: "critical system failure, minimal operation",
    interval_multiplier: 5.0,
    retry_multiplier: 0.5,
    notifications_enabled: false,
    history_logging_enabled: false,
    status_commands_enabled: true,
    active_fallbacks: &[
        "cached-value",
        "extended-timeouts",
        "read-only",
        "silent-monitoring",
        "basic-logging-only",
    ],
};

/// One recorded degradation level change.
#[derive(Debug, Clone, Serialize)]
pub struct DegradationTransition {
    pub timestamp: f64,
    pub from_level: DegradationLevel,
    pub to_level: DegradationLevel,
    pub failed_names: Vec<String>,
    pub degraded_names: Vec<String>,
    pub trigger: String,
}
