//! Wall-clock helpers.
//!
//! Health records and the persisted queue store epoch seconds so they stay
//! meaningful across restarts; everything that needs "now" in that form goes
//! through here.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as fractional epoch seconds.
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
