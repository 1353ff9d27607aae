//! IP Sentinel binary: composition root.
//!
//! Every long-lived component is constructed here and shared by handle;
//! nothing in the library reaches for globals.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use ip_sentinel::config;
use ip_sentinel::health::HealthMonitor;
use ip_sentinel::lifecycle::{run_ticker, Shutdown, TickPolicy};
use ip_sentinel::notify::{ChatTransport, WebhookTransport};
use ip_sentinel::observability;
use ip_sentinel::queue::DeliveryQueue;
use ip_sentinel::resilience::{AdmissionLimiter, TransportLimiter};
use ip_sentinel::watch::{HttpIpSource, IpWatcher};

#[derive(Parser)]
#[command(name = "ip-sentinel", version, about = "Public IP change monitor and notifier")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load_config(&args.config)?;

    observability::logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ip-sentinel starting");
    tracing::info!(
        config = %args.config.display(),
        interval_secs = config.watch.interval_secs,
        destination_id = config.notify.destination_id,
        queue_path = %config.queue.path.display(),
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            );
        }
    }

    let health = Arc::new(HealthMonitor::new());
    for name in ["ip-source", "chat-api", "storage", "admission-limiter"] {
        health.register(name, HashMap::new());
    }

    let transport: Arc<dyn ChatTransport> = Arc::new(WebhookTransport::with_timeout(
        &config.notify.base_url,
        Duration::from_secs(config.notify.request_timeout_secs),
    ));
    let limiter = Arc::new(TransportLimiter::new(config.backoff.policy()));
    let admission = Arc::new(AdmissionLimiter::new(
        Duration::from_secs(config.admission.period_secs),
        config.admission.max_calls,
    ));
    let queue = Arc::new(DeliveryQueue::new(
        config.queue.clone(),
        transport.clone(),
        limiter.clone(),
        health.clone(),
    ));
    let source = Arc::new(HttpIpSource::new(
        &config.watch.source_url,
        &config.watch.fallback_urls,
        Duration::from_secs(config.watch.timeout_secs),
    ));
    let watcher = Arc::new(IpWatcher::new(
        &config.watch,
        config.notify.destination_id,
        source,
        transport,
        limiter,
        admission,
        queue.clone(),
        health.clone(),
    ));

    let shutdown = Shutdown::new();
    queue.start(&shutdown);

    let base_interval = Duration::from_secs(config.watch.interval_secs);
    let ticker = {
        let shutdown = shutdown.clone();
        let health = health.clone();
        let watcher = watcher.clone();
        tokio::spawn(async move {
            run_ticker(
                move || health.adjusted_interval(base_interval),
                async {},
                move || {
                    let watcher = watcher.clone();
                    async move { watcher.tick().await }
                },
                |err| {
                    tracing::error!(error = %err, "IP check failed");
                    TickPolicy::Continue
                },
                &shutdown,
            )
            .await;
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("SIGINT received, shutting down");
    shutdown.trigger();
    let _ = ticker.await;
    queue.stop();

    tracing::info!("Shutdown complete");
    Ok(())
}
