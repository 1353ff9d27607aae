//! End-to-end delivery queue behavior over a programmable transport.

mod common;

use common::{build_queue, queue_config, standard_health, ProgrammableTransport};
use ip_sentinel::notify::ChatError;
use ip_sentinel::queue::{MessagePriority, MessageStatus, NewMessage};

#[tokio::test]
async fn test_higher_priority_delivered_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = queue_config(&dir);
    config.batch_size = 2;
    let transport = ProgrammableTransport::always_ok();
    let queue = build_queue(config, transport.clone(), standard_health());

    let low = queue
        .enqueue(NewMessage::new(1, "low").priority(MessagePriority::Low))
        .await;
    queue
        .enqueue(NewMessage::new(1, "critical").priority(MessagePriority::Critical))
        .await;
    queue
        .enqueue(NewMessage::new(1, "high").priority(MessagePriority::High))
        .await;

    // Batch of 2 takes the two highest tiers; the low message waits.
    assert_eq!(queue.process_once().await, 2);
    assert_eq!(transport.call_count(), 2);
    let status = queue.status().await;
    assert_eq!(status.queue_size, 1);
    assert!(queue.message(low).await.is_some());

    assert_eq!(queue.process_once().await, 1);
    assert_eq!(queue.status().await.queue_size, 0);
}

#[tokio::test]
async fn test_dedupe_collapses_identical_notifications() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ProgrammableTransport::always_ok();
    let queue = build_queue(queue_config(&dir), transport.clone(), standard_health());

    let first = queue
        .enqueue(NewMessage::new(1, "IP changed").dedupe_key("k1"))
        .await;
    let second = queue
        .enqueue(NewMessage::new(1, "IP changed").dedupe_key("k1"))
        .await;
    assert_eq!(first, second);

    let status = queue.status().await;
    assert_eq!(status.queue_size, 1);
    assert_eq!(status.statistics.total_deduplicated, 1);

    // After delivery the key is free again.
    queue.process_once().await;
    let third = queue
        .enqueue(NewMessage::new(1, "IP changed").dedupe_key("k1"))
        .await;
    assert_ne!(first, third);
    assert_eq!(queue.status().await.queue_size, 1);
}

#[tokio::test]
async fn test_transient_failure_reschedules_with_backoff() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ProgrammableTransport::script(vec![Err(ChatError::Server(503))]);
    let queue = build_queue(queue_config(&dir), transport.clone(), standard_health());

    let id = queue.enqueue(NewMessage::new(1, "flaky")).await;
    assert_eq!(queue.process_once().await, 1);

    let message = queue.message(id).await.expect("message retained for retry");
    assert_eq!(message.status, MessageStatus::Pending);
    assert_eq!(message.retry_count, 1);
    assert!(message.scheduled_at.is_some());
    assert_eq!(message.last_error.as_deref(), Some("server error: status 503"));

    // The backoff delay has not elapsed, so the next cycle attempts nothing.
    assert_eq!(queue.process_once().await, 0);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_permanent_failure_counted_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ProgrammableTransport::script(vec![Err(ChatError::Client(404))]);
    let queue = build_queue(queue_config(&dir), transport, standard_health());

    queue.enqueue(NewMessage::new(1, "bad destination")).await;
    queue.process_once().await;

    let status = queue.status().await;
    assert_eq!(status.queue_size, 0);
    assert_eq!(status.statistics.total_failed, 1);
    assert_eq!(status.dedupe_index_size, 0);
}

#[tokio::test]
async fn test_pending_work_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let health = standard_health();

    {
        let queue = build_queue(
            queue_config(&dir),
            ProgrammableTransport::always_ok(),
            health.clone(),
        );
        queue
            .enqueue(NewMessage::new(1, "queued before crash").priority(MessagePriority::High))
            .await;
    }

    let transport = ProgrammableTransport::always_ok();
    let queue = build_queue(queue_config(&dir), transport.clone(), health);
    assert_eq!(queue.status().await.queue_size, 1);

    assert_eq!(queue.process_once().await, 1);
    assert_eq!(transport.call_count(), 1);
    let status = queue.status().await;
    assert_eq!(status.queue_size, 0);
    assert_eq!(status.statistics.total_delivered, 1);
}

#[tokio::test]
async fn test_statistics_accumulate_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let health = standard_health();

    {
        let queue = build_queue(
            queue_config(&dir),
            ProgrammableTransport::always_ok(),
            health.clone(),
        );
        queue.enqueue(NewMessage::new(1, "one")).await;
        queue.process_once().await;
    }

    let queue = build_queue(queue_config(&dir), ProgrammableTransport::always_ok(), health);
    queue.enqueue(NewMessage::new(1, "two")).await;
    queue.process_once().await;

    let status = queue.status().await;
    assert_eq!(status.statistics.total_queued, 2);
    assert_eq!(status.statistics.total_delivered, 2);
}

#[tokio::test]
async fn test_retry_failed_revives_restored_failures() {
    let dir = tempfile::tempdir().unwrap();
    let health = standard_health();

    // Build a persisted document containing a Failed record, as an older
    // run could have left behind.
    let id = {
        let queue = build_queue(
            queue_config(&dir),
            ProgrammableTransport::always_ok(),
            health.clone(),
        );
        queue.enqueue(NewMessage::new(1, "stuck")).await
    };
    let path = dir.path().join("queue.json");
    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    doc["queue"][0]["status"] = serde_json::json!("failed");
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let transport = ProgrammableTransport::always_ok();
    let queue = build_queue(queue_config(&dir), transport.clone(), health);
    // Failed records are never picked up by the normal cycle.
    assert_eq!(queue.process_once().await, 0);

    assert_eq!(queue.retry_failed().await, 1);
    let message = queue.message(id).await.unwrap();
    assert_eq!(message.status, MessageStatus::Pending);

    assert_eq!(queue.process_once().await, 1);
    assert_eq!(transport.call_count(), 1);
}
