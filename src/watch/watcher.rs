//! IP change detection and announcement.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::clock::epoch_secs;
use crate::config::WatchConfig;
use crate::health::HealthMonitor;
use crate::notify::ChatTransport;
use crate::observability::metrics;
use crate::queue::{DeliveryQueue, MessagePriority, NewMessage};
use crate::resilience::{AdmissionLimiter, TransportLimiter};
use crate::watch::source::{IpSource, SourceError};

const STATE_VERSION: u32 = 1;

fn default_state_version() -> u32 {
    STATE_VERSION
}

/// Watcher tick failure. Only lookup errors propagate; notification
/// failures degrade to the queue instead.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Last observed address, persisted across restarts.
#[derive(Debug, Serialize, Deserialize)]
struct WatchState {
    #[serde(default = "default_state_version")]
    version: u32,
    last_ip: Option<IpAddr>,
    changed_at: Option<f64>,
}

/// Polls the public address and announces changes.
///
/// Constructed once at the composition root; `tick` is driven by the
/// scheduler. Fetching always runs, even when degradation has switched
/// announcements off, so recovery is observed promptly.
pub struct IpWatcher {
    destination_id: u64,
    state_path: PathBuf,
    source: Arc<dyn IpSource>,
    transport: Arc<dyn ChatTransport>,
    limiter: Arc<TransportLimiter>,
    admission: Arc<AdmissionLimiter>,
    queue: Arc<DeliveryQueue>,
    health: Arc<HealthMonitor>,
    last_ip: Mutex<Option<IpAddr>>,
}

impl IpWatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &WatchConfig,
        destination_id: u64,
        source: Arc<dyn IpSource>,
        transport: Arc<dyn ChatTransport>,
        limiter: Arc<TransportLimiter>,
        admission: Arc<AdmissionLimiter>,
        queue: Arc<DeliveryQueue>,
        health: Arc<HealthMonitor>,
    ) -> Self {
        let last_ip = load_state(&config.state_path);
        if let Some(address) = last_ip {
            tracing::info!(address = %address, "restored last observed address");
        }

        Self {
            destination_id,
            state_path: config.state_path.clone(),
            source,
            transport,
            limiter,
            admission,
            queue,
            health,
            last_ip: Mutex::new(last_ip),
        }
    }

    /// The last observed address, if any.
    pub async fn current(&self) -> Option<IpAddr> {
        *self.last_ip.lock().await
    }

    /// One polling cycle: fetch, compare, announce on change.
    pub async fn tick(&self) -> Result<(), WatchError> {
        let address = match self.source.fetch().await {
            Ok(address) => {
                self.health.record_success("ip-source", Some("fetch"));
                metrics::record_ip_check("ok");
                address
            }
            Err(err) => {
                self.health
                    .record_failure("ip-source", &err.to_string(), Some("fetch"));
                metrics::record_ip_check("error");
                return Err(err.into());
            }
        };

        let previous = {
            let mut guard = self.last_ip.lock().await;
            let previous = *guard;
            *guard = Some(address);
            previous
        };

        match previous {
            None => {
                tracing::info!(address = %address, "initial public address observed");
                self.save_state(address);
            }
            Some(previous) if previous != address => {
                metrics::record_ip_change();
                tracing::info!(from = %previous, to = %address, "public address changed");
                self.save_state(address);
                self.announce(previous, address).await;
            }
            Some(_) => {
                tracing::debug!(address = %address, "public address unchanged");
            }
        }
        Ok(())
    }

    /// Deliver a change notice, falling back to the queue when the direct
    /// path is limited or failing.
    async fn announce(&self, previous: IpAddr, current: IpAddr) {
        if !self.health.feature_enabled("notifications") {
            tracing::warn!(
                from = %previous,
                to = %current,
                "notifications disabled by degradation profile, change not announced"
            );
            return;
        }

        let content = format!("Public IP changed from {previous} to {current}");
        let dedupe_key = format!("ip-change:{current}");

        let (limited, wait) = self.admission.is_limited();
        if limited {
            metrics::record_rate_limited("admission");
            tracing::warn!(wait_secs = wait, "notification admission limit reached, queueing");
            self.enqueue_fallback(content, dedupe_key).await;
            return;
        }
        self.admission.record_call();

        match self
            .limiter
            .send_message(self.transport.as_ref(), self.destination_id, &content, None)
            .await
        {
            Ok(Some(_)) => {
                self.health.record_success("chat-api", Some("change_notice"));
                tracing::info!("change notification delivered");
            }
            Ok(None) => {
                tracing::warn!("direct notification retry budget exhausted, queueing");
                self.enqueue_fallback(content, dedupe_key).await;
            }
            Err(err) => {
                self.health
                    .record_failure("chat-api", &err.to_string(), Some("change_notice"));
                tracing::warn!(error = %err, "direct notification failed, queueing");
                self.enqueue_fallback(content, dedupe_key).await;
            }
        }
    }

    async fn enqueue_fallback(&self, content: String, dedupe_key: String) {
        let id = self
            .queue
            .enqueue(
                NewMessage::new(self.destination_id, content)
                    .priority(MessagePriority::High)
                    .dedupe_key(dedupe_key),
            )
            .await;
        tracing::info!(id = %id, "change notification queued for later delivery");
    }

    fn save_state(&self, address: IpAddr) {
        let state = WatchState {
            version: STATE_VERSION,
            last_ip: Some(address),
            changed_at: Some(epoch_secs()),
        };
        let result = serde_json::to_vec_pretty(&state)
            .map_err(std::io::Error::other)
            .and_then(|bytes| {
                let tmp_path = self.state_path.with_extension("tmp");
                fs::write(&tmp_path, bytes)?;
                fs::rename(&tmp_path, &self.state_path)
            });

        match result {
            Ok(()) => {
                self.health.record_success("storage", Some("watch_state"));
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to persist watch state");
                self.health
                    .record_failure("storage", &err.to_string(), Some("watch_state"));
            }
        }
    }
}

fn load_state(path: &Path) -> Option<IpAddr> {
    if !path.exists() {
        return None;
    }
    let parsed = fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_slice::<WatchState>(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(state) => state.last_ip,
        Err(err) => {
            tracing::warn!(error = err, "failed to load watch state, starting fresh");
            None
        }
    }
}
