//! Explicit periodic-task scheduler.
//!
//! Background cadence lives here instead of being buried in each component:
//! the caller supplies the interval, a readiness gate, the tick body, and an
//! error policy, and gets a loop that is shutdown-aware at every await point.

use std::future::Future;
use std::time::Duration;

use crate::lifecycle::Shutdown;

/// What to do with the loop after a tick error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    Continue,
    Stop,
}

/// Drive `tick` on a recurring schedule until shutdown.
///
/// `ready` gates the first tick (e.g. waiting for a connection to come up).
/// `interval_of` is consulted before every lap, so a caller deriving it from
/// the health monitor gets degradation-scaled cadence without restarting the
/// loop. `on_error` decides whether a failed tick stops the schedule.
pub async fn run_ticker<D, R, T, Fut, E, H>(
    mut interval_of: D,
    ready: R,
    mut tick: T,
    mut on_error: H,
    shutdown: &Shutdown,
) where
    D: FnMut() -> Duration,
    R: Future<Output = ()>,
    T: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    H: FnMut(&E) -> TickPolicy,
{
    let mut shutdown_rx = shutdown.subscribe();

    tokio::select! {
        _ = ready => {}
        _ = shutdown_rx.recv() => {
            tracing::debug!("shutdown before first tick");
            return;
        }
    }

    loop {
        let delay = interval_of();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                if let Err(err) = tick().await {
                    if on_error(&err) == TickPolicy::Stop {
                        tracing::warn!("ticker stopped by error policy");
                        return;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                tracing::debug!("ticker received shutdown signal");
                return;
            }
        }
    }
}
