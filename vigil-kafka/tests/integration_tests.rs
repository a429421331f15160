//! Integration tests for the Kafka audit data provider.
//!
//! Producer construction does not contact the broker, so the lazy
//! initialization tests run offline. Tests that need a reachable broker are
//! `#[ignore]`d and read the broker list from `KAFKA_BROKERS`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use vigil_core::{AuditDataProvider, AuditEvent, CancellationToken};
use vigil_kafka::KafkaDataProvider;

#[test]
fn test_producer_builds_exactly_once_under_concurrency() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let provider = KafkaDataProvider::<String>::from_brokers("localhost:9092")
        .with_producer_customizer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                provider.producer().expect("producer build failed");
            });
        }
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);

    // Later callers observe the already-built handle.
    let first = provider.producer().unwrap() as *const _;
    let second = provider.producer().unwrap() as *const _;
    assert_eq!(first, second);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_build_is_not_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let provider = KafkaDataProvider::<String>::from_brokers("localhost:9092")
        .with_producer_customizer(move |config| {
            // Poison only the first build attempt.
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                config.set("message.timeout.ms", "not-a-number");
            }
        });

    let err = provider.producer().unwrap_err();
    assert!(matches!(err, vigil_core::AuditError::Configuration(_)));

    // The failure was not cached; the retry builds a working producer.
    provider.producer().expect("second build should succeed");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_before_delivery_fails_with_cancelled() {
    // Nothing listens on this port; the delivery future stays pending long
    // enough for the token to win the race.
    let provider = KafkaDataProvider::<String>::from_brokers("localhost:1")
        .with_topic("audit-cancel")
        .with_queue_timeout(Duration::from_secs(60));

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = provider
        .insert_event_cancellable(&AuditEvent::new("test"), &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_pre_cancelled_token_short_circuits() {
    let provider = KafkaDataProvider::<String>::from_brokers("localhost:1")
        .with_queue_timeout(Duration::from_secs(60));

    let token = CancellationToken::new();
    token.cancel();

    let err = provider
        .insert_event_cancellable(&AuditEvent::new("test"), &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_get_event_is_unsupported() {
    let provider = KafkaDataProvider::<String>::from_brokers("localhost:9092");
    let err = provider
        .get_event::<AuditEvent>(&Some("key".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
}

fn brokers() -> String {
    std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string())
}

#[tokio::test]
#[ignore = "requires a reachable Kafka broker"]
async fn test_insert_returns_message_key_and_reports_delivery() {
    let reports = Arc::new(AtomicUsize::new(0));
    let counter = reports.clone();
    let provider = KafkaDataProvider::<String>::from_brokers(brokers())
        .with_topic("audit-topic-test")
        .with_key_selector(|ev| Ok(Some(ev.event_type.clone())))
        .with_result_handler(move |report| {
            assert_eq!(report.topic, "audit-topic-test");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let event = AuditEvent::new("order.create");
    let key = provider.insert_event(&event).await.unwrap();
    assert_eq!(key.as_deref(), Some("order.create"));
    assert_eq!(reports.load(Ordering::SeqCst), 1);

    // Replace on an append-only log produces another message.
    provider.replace_event(&key, &event).await.unwrap();
    assert_eq!(reports.load(Ordering::SeqCst), 2);
}

#[test]
#[ignore = "requires a reachable Kafka broker"]
fn test_blocking_insert_matches_async_insert() {
    let provider = KafkaDataProvider::<String>::from_brokers(brokers())
        .with_topic("audit-topic-test")
        .with_key_selector(|ev| Ok(Some(ev.event_type.clone())));

    let key = provider
        .insert_event_blocking(&AuditEvent::new("order.create"))
        .unwrap();
    assert_eq!(key.as_deref(), Some("order.create"));
}
