//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, batch within cap)
//! - Check cross-field consistency (backoff delay bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::AppConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.watch.source_url.is_empty() {
        errors.push(ValidationError::new("watch.source_url", "must not be empty"));
    }
    if config.watch.interval_secs == 0 {
        errors.push(ValidationError::new("watch.interval_secs", "must be > 0"));
    }
    if config.watch.timeout_secs == 0 {
        errors.push(ValidationError::new("watch.timeout_secs", "must be > 0"));
    }

    if config.notify.base_url.is_empty() {
        errors.push(ValidationError::new("notify.base_url", "must not be empty"));
    }
    if config.notify.destination_id == 0 {
        errors.push(ValidationError::new("notify.destination_id", "must be set"));
    }
    if config.notify.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "notify.request_timeout_secs",
            "must be > 0",
        ));
    }

    if config.queue.max_size == 0 {
        errors.push(ValidationError::new("queue.max_size", "must be > 0"));
    }
    if config.queue.batch_size == 0 {
        errors.push(ValidationError::new("queue.batch_size", "must be > 0"));
    } else if config.queue.batch_size > config.queue.max_size {
        errors.push(ValidationError::new(
            "queue.batch_size",
            "must not exceed queue.max_size",
        ));
    }
    if config.queue.process_interval_secs <= 0.0 {
        errors.push(ValidationError::new(
            "queue.process_interval_secs",
            "must be > 0",
        ));
    }

    if config.admission.max_calls == 0 {
        errors.push(ValidationError::new("admission.max_calls", "must be > 0"));
    }
    if config.admission.period_secs == 0 {
        errors.push(ValidationError::new("admission.period_secs", "must be > 0"));
    }

    if config.backoff.base_delay_secs <= 0.0 {
        errors.push(ValidationError::new("backoff.base_delay_secs", "must be > 0"));
    }
    if config.backoff.max_delay_secs < config.backoff.base_delay_secs {
        errors.push(ValidationError::new(
            "backoff.max_delay_secs",
            "must be >= backoff.base_delay_secs",
        ));
    }
    if config.backoff.backoff_factor < 1.0 {
        errors.push(ValidationError::new(
            "backoff.backoff_factor",
            "must be >= 1.0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
