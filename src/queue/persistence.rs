//! Queue persistence.
//!
//! The full live set plus cumulative stats serialize as one JSON document,
//! written to a temp path and atomically renamed over the target. Loads are
//! tolerant: individually corrupt records are skipped and logged rather than
//! aborting startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::epoch_secs;
use crate::queue::message::QueuedMessage;

/// Document schema version written with every save.
const SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// Cumulative queue statistics, persisted with the live set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    pub total_queued: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_expired: u64,
    pub total_deduplicated: u64,
}

/// Persistence failure. Callers log and continue; durability is best-effort.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("queue file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("queue document encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    queue: &'a [QueuedMessage],
    stats: &'a QueueStats,
    saved_at: f64,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    queue: Vec<serde_json::Value>,
    #[serde(default)]
    stats: QueueStats,
}

/// Write the live set and stats as one document, atomically.
pub fn save(path: &Path, queue: &[QueuedMessage], stats: &QueueStats) -> Result<(), PersistenceError> {
    let document = DocumentRef {
        version: SCHEMA_VERSION,
        queue,
        stats,
        saved_at: epoch_secs(),
    };

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, serde_json::to_vec_pretty(&document)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load the live set and stats from disk.
///
/// A missing file yields an empty queue. Corrupt individual records are
/// skipped with a warning; only an unreadable document is an error.
pub fn load(path: &Path) -> Result<(Vec<QueuedMessage>, QueueStats), PersistenceError> {
    if !path.exists() {
        return Ok((Vec::new(), QueueStats::default()));
    }

    let raw = fs::read(path)?;
    let document: Document = serde_json::from_slice(&raw)?;

    let mut queue = Vec::with_capacity(document.queue.len());
    for record in document.queue {
        match serde_json::from_value::<QueuedMessage>(record) {
            Ok(message) => queue.push(message),
            Err(err) => {
                tracing::warn!(error = %err, "skipping corrupt queued message record");
            }
        }
    }

    tracing::info!(
        version = document.version,
        messages = queue.len(),
        "loaded queue from disk"
    );
    Ok((queue, document.stats))
}
