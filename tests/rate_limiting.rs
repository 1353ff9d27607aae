//! Rate limiting across the admission and transport layers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{queue_config, standard_health, ProgrammableTransport};
use ip_sentinel::notify::ChatError;
use ip_sentinel::queue::{DeliveryQueue, NewMessage};
use ip_sentinel::resilience::{AdmissionLimiter, BackoffPolicy, NoJitter, TransportLimiter};

fn retrying_limiter(max_retries: u32) -> Arc<TransportLimiter> {
    Arc::new(TransportLimiter::with_jitter(
        BackoffPolicy {
            max_retries,
            base_delay_secs: 1.0,
            max_delay_secs: 60.0,
            backoff_factor: 2.0,
        },
        Box::new(NoJitter),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_delivery_recovers_in_one_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ProgrammableTransport::script(vec![Err(ChatError::RateLimited {
        retry_after: Some(2.0),
        global: false,
    })]);
    let queue = Arc::new(DeliveryQueue::new(
        queue_config(&dir),
        transport.clone(),
        retrying_limiter(3),
        standard_health(),
    ));

    queue.enqueue(NewMessage::new(1, "retried inside limiter")).await;
    let started = tokio::time::Instant::now();
    assert_eq!(queue.process_once().await, 1);

    // The limiter honored the 2s hint and retried within the same cycle.
    assert_eq!(transport.call_count(), 2);
    assert!(started.elapsed() >= Duration::from_secs(2));
    let status = queue.status().await;
    assert_eq!(status.queue_size, 0);
    assert_eq!(status.statistics.total_delivered, 1);
}

#[tokio::test(start_paused = true)]
async fn test_global_window_stalls_every_bucket() {
    let limiter = retrying_limiter(0);

    let result: Result<Option<u32>, _> = limiter
        .execute(
            || async {
                Err(ChatError::RateLimited {
                    retry_after: Some(30.0),
                    global: true,
                })
            },
            "destinations/1/messages",
            "POST",
        )
        .await;
    assert!(result.is_err());
    assert!(limiter.backoff_info().global_limited);

    // A different bucket still waits out the global window.
    let started = tokio::time::Instant::now();
    let result = limiter
        .execute(
            || async { Ok::<_, ChatError>(7u32) },
            "destinations/2/messages",
            "POST",
        )
        .await;
    assert_eq!(result.unwrap(), Some(7));
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_bucket_windows_are_independent() {
    let limiter = retrying_limiter(0);

    let result: Result<Option<u32>, _> = limiter
        .execute(
            || async {
                Err(ChatError::RateLimited {
                    retry_after: Some(30.0),
                    global: false,
                })
            },
            "destinations/1/messages",
            "POST",
        )
        .await;
    assert!(result.is_err());

    // The other bucket is unaffected.
    let started = tokio::time::Instant::now();
    let result = limiter
        .execute(
            || async { Ok::<_, ChatError>(7u32) },
            "destinations/2/messages",
            "POST",
        )
        .await;
    assert_eq!(result.unwrap(), Some(7));
    assert!(started.elapsed() < Duration::from_secs(1));

    let info = limiter.backoff_info();
    assert!(!info.global_limited);
    assert_eq!(info.active_buckets, vec!["POST:destinations/1/messages"]);
}

#[tokio::test(start_paused = true)]
async fn test_admission_window_frees_after_period() {
    let limiter = AdmissionLimiter::new(Duration::from_secs(10), 2);
    limiter.record_call();
    limiter.record_call();

    tokio::time::advance(Duration::from_secs(1)).await;
    let (limited, wait) = limiter.is_limited();
    assert!(limited);
    assert_eq!(wait, 9);
    assert_eq!(limiter.remaining(), 0);

    tokio::time::advance(Duration::from_secs(10)).await;
    let (limited, wait) = limiter.is_limited();
    assert!(!limited);
    assert_eq!(wait, 0);
    assert_eq!(limiter.remaining(), 2);
}
