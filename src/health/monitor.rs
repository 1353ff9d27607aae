//! System health monitor.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::clock::epoch_secs;
use crate::health::degradation::{profile, DegradationProfile, DegradationTransition};
use crate::health::state::{DegradationLevel, DependencyHealth, DependencyStatus};
use crate::observability::metrics;

/// Dependencies whose failure forces elevated degradation regardless of the
/// generic arithmetic.
const CRITICAL_DEPENDENCIES: &[&str] = &["ip-source", "storage"];

/// Failures before a Healthy dependency is marked Degraded.
const DEGRADED_THRESHOLD: u32 = 2;
/// Failures before a dependency is marked Failed.
const FAILED_THRESHOLD: u32 = 5;
/// Consecutive successes needed for Degraded → Healthy.
const RECOVERY_THRESHOLD: u32 = 3;
/// Transition log bound; oldest entries are evicted first.
const TRANSITION_LOG_CAP: usize = 50;

struct MonitorState {
    deps: HashMap<String, DependencyHealth>,
    level: DegradationLevel,
    transitions: VecDeque<DegradationTransition>,
}

/// Tracks per-dependency health and derives the system degradation level.
///
/// Constructed once at the composition root and shared by handle; every
/// collaborator records outcomes here and reads scaled parameters back.
pub struct HealthMonitor {
    inner: Mutex<MonitorState>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MonitorState {
                deps: HashMap::new(),
                level: DegradationLevel::Normal,
                transitions: VecDeque::new(),
            }),
        }
    }

    /// Register a dependency for tracking. Idempotent.
    pub fn register(&self, name: &str, capabilities: HashMap<String, bool>) {
        let mut state = self.lock();
        if !state.deps.contains_key(name) {
            tracing::debug!(dependency = name, "registered dependency");
            state
                .deps
                .insert(name.to_string(), DependencyHealth::new(name, capabilities));
        }
    }

    /// Record a successful operation for a dependency.
    pub fn record_success(&self, name: &str, operation: Option<&str>) {
        let mut state = self.lock();
        let now = epoch_secs();

        let Some(dep) = state.deps.get_mut(name) else {
            tracing::warn!(dependency = name, "success recorded for unknown dependency");
            return;
        };

        dep.last_success_ts = Some(now);
        dep.success_count += 1;
        dep.consecutive_successes += 1;
        dep.last_error = None;

        match dep.status {
            DependencyStatus::Failed => {
                dep.status = DependencyStatus::Degraded;
                dep.degraded_since_ts = Some(now);
                tracing::info!(dependency = name, operation, "dependency recovering from failure");
            }
            DependencyStatus::Degraded if dep.consecutive_successes >= RECOVERY_THRESHOLD => {
                dep.status = DependencyStatus::Healthy;
                dep.degraded_since_ts = None;
                tracing::info!(dependency = name, operation, "dependency fully recovered");
            }
            DependencyStatus::Unknown => {
                dep.status = DependencyStatus::Healthy;
            }
            _ => {}
        }

        // Sustained success slowly pays down the failure count.
        if dep.success_count % 5 == 0 && dep.failure_count > 0 {
            dep.failure_count -= 1;
        }

        self.evaluate(&mut state, "automatic");
    }

    /// Record a failed operation for a dependency.
    pub fn record_failure(&self, name: &str, error: &str, operation: Option<&str>) {
        let mut state = self.lock();
        let now = epoch_secs();

        let Some(dep) = state.deps.get_mut(name) else {
            tracing::warn!(dependency = name, "failure recorded for unknown dependency");
            return;
        };

        dep.last_failure_ts = Some(now);
        dep.failure_count += 1;
        dep.consecutive_successes = 0;
        dep.last_error = Some(error.to_string());

        if dep.failure_count >= FAILED_THRESHOLD {
            if dep.status != DependencyStatus::Failed {
                dep.status = DependencyStatus::Failed;
                tracing::error!(
                    dependency = name,
                    operation,
                    failures = dep.failure_count,
                    error,
                    "dependency marked failed"
                );
            }
        } else if dep.failure_count >= DEGRADED_THRESHOLD
            && dep.status == DependencyStatus::Healthy
        {
            dep.status = DependencyStatus::Degraded;
            dep.degraded_since_ts = Some(now);
            tracing::warn!(dependency = name, operation, error, "dependency marked degraded");
        }

        self.evaluate(&mut state, "automatic");
    }

    /// Current status of one dependency, if registered.
    pub fn dependency_status(&self, name: &str) -> Option<DependencyStatus> {
        self.lock().deps.get(name).map(|d| d.status)
    }

    /// Current degradation level.
    pub fn level(&self) -> DegradationLevel {
        self.lock().level
    }

    /// Per-dependency summaries, current level and profile, recent transitions.
    pub fn snapshot(&self) -> HealthSnapshot {
        let state = self.lock();
        let now = epoch_secs();
        let current = profile(state.level);

        let dependencies = state
            .deps
            .values()
            .map(|dep| {
                (
                    dep.name.clone(),
                    DependencySummary {
                        status: dep.status,
                        failure_count: dep.failure_count,
                        success_count: dep.success_count,
                        last_success_ago: dep.last_success_ts.map(|t| now - t),
                        last_failure_ago: dep.last_failure_ts.map(|t| now - t),
                        last_error: dep.last_error.clone(),
                        degraded_for: dep.degraded_since_ts.map(|t| now - t),
                        capabilities: dep.capabilities.clone(),
                    },
                )
            })
            .collect();

        HealthSnapshot {
            level: state.level,
            profile: current.clone(),
            dependencies,
            recent_transitions: state
                .transitions
                .iter()
                .rev()
                .take(10)
                .rev()
                .cloned()
                .collect(),
        }
    }

    /// Polling interval scaled by the current profile.
    pub fn adjusted_interval(&self, base: Duration) -> Duration {
        base.mul_f64(profile(self.lock().level).interval_multiplier)
    }

    /// Retry count scaled by the current profile, never below 1.
    pub fn adjusted_retry_count(&self, base: u32) -> u32 {
        let adjusted = (base as f64 * profile(self.lock().level).retry_multiplier) as u32;
        adjusted.max(1)
    }

    /// Whether a named feature is enabled at the current level.
    ///
    /// Unknown feature names default to enabled.
    pub fn feature_enabled(&self, feature: &str) -> bool {
        let current = profile(self.lock().level);
        match feature {
            "notifications" => current.notifications_enabled,
            "history_logging" => current.history_logging_enabled,
            "status_commands" => current.status_commands_enabled,
            _ => true,
        }
    }

    /// Whether a named fallback behavior is active at the current level.
    pub fn fallback_active(&self, fallback: &str) -> bool {
        profile(self.lock().level)
            .active_fallbacks
            .contains(&fallback)
    }

    /// Unconditionally override the degradation level.
    pub fn force_level(&self, level: DegradationLevel, reason: &str) {
        let mut state = self.lock();
        let previous = state.level;
        state.level = level;
        let (failed, degraded) = Self::partition_names(&state.deps);
        Self::push_transition(
            &mut state,
            previous,
            level,
            failed,
            degraded,
            format!("manual:{reason}"),
        );
        metrics::record_degradation_level(level as u8);
        tracing::info!(level = level.as_str(), reason, "degradation level forced");
    }

    /// Zero a dependency back to Unknown and re-evaluate.
    pub fn reset(&self, name: &str) -> bool {
        let mut state = self.lock();
        let Some(dep) = state.deps.get_mut(name) else {
            return false;
        };
        dep.reset();
        tracing::info!(dependency = name, "dependency health reset");
        self.evaluate(&mut state, "automatic");
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.inner.lock().expect("health state mutex poisoned")
    }

    fn partition_names(deps: &HashMap<String, DependencyHealth>) -> (Vec<String>, Vec<String>) {
        let mut failed = Vec::new();
        let mut degraded = Vec::new();
        for dep in deps.values() {
            match dep.status {
                DependencyStatus::Failed => failed.push(dep.name.clone()),
                DependencyStatus::Degraded => degraded.push(dep.name.clone()),
                _ => {}
            }
        }
        failed.sort();
        degraded.sort();
        (failed, degraded)
    }

    /// Re-derive the system level from the dependency set.
    fn evaluate(&self, state: &mut MonitorState, trigger: &str) {
        let (failed, degraded) = Self::partition_names(&state.deps);
        let healthy = state
            .deps
            .values()
            .filter(|d| d.status == DependencyStatus::Healthy)
            .count();

        let f = failed.len();
        let d = degraded.len();

        let mut new_level = if f == 0 && d == 0 {
            DegradationLevel::Normal
        } else if f == 0 && d <= 1 {
            DegradationLevel::Minor
        } else if f <= 1 || (f == 0 && d >= 2) {
            DegradationLevel::Moderate
        } else if f >= 2 || healthy <= 1 {
            DegradationLevel::Severe
        } else {
            DegradationLevel::Critical
        };

        let critical_failed = failed
            .iter()
            .filter(|n| CRITICAL_DEPENDENCIES.contains(&n.as_str()))
            .count();
        if critical_failed >= 2 {
            new_level = DegradationLevel::Critical;
        } else if critical_failed == 1 && new_level < DegradationLevel::Severe {
            new_level = DegradationLevel::Severe;
        }

        if new_level != state.level {
            let previous = state.level;
            state.level = new_level;
            Self::push_transition(
                state,
                previous,
                new_level,
                failed,
                degraded,
                trigger.to_string(),
            );
            metrics::record_degradation_level(new_level as u8);

            if new_level > previous {
                tracing::warn!(
                    from = previous.as_str(),
                    to = new_level.as_str(),
                    mode = profile(new_level).description,
                    "system degradation increased"
                );
            } else {
                tracing::info!(
                    from = previous.as_str(),
                    to = new_level.as_str(),
                    mode = profile(new_level).description,
                    "system degradation decreased"
                );
            }
        }
    }

    fn push_transition(
        state: &mut MonitorState,
        from_level: DegradationLevel,
        to_level: DegradationLevel,
        failed_names: Vec<String>,
        degraded_names: Vec<String>,
        trigger: String,
    ) {
        state.transitions.push_back(DegradationTransition {
            timestamp: epoch_secs(),
            from_level,
            to_level,
            failed_names,
            degraded_names,
            trigger,
        });
        while state.transitions.len() > TRANSITION_LOG_CAP {
            state.transitions.pop_front();
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one dependency for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct DependencySummary {
    pub status: DependencyStatus,
    pub failure_count: u32,
    pub success_count: u64,
    pub last_success_ago: Option<f64>,
    pub last_failure_ago: Option<f64>,
    pub last_error: Option<String>,
    pub degraded_for: Option<f64>,
    pub capabilities: HashMap<String, bool>,
}

/// Full system health view.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub level: DegradationLevel,
    pub profile: DegradationProfile,
    pub dependencies: BTreeMap<String, DependencySummary>,
    pub recent_transitions: Vec<DegradationTransition>,
}
