//! End-to-end lifecycle of a single circuit breaker: trip, fail fast,
//! probe, recover.

use ai_resilience_rust::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Error, ErrorContext, Result,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn boom() -> Error {
    Error::runtime_with_context("boom", ErrorContext::new())
}

#[tokio::test]
async fn trip_fail_fast_probe_and_close() {
    let cb = CircuitBreaker::new(
        "image-api",
        CircuitBreakerConfig::new()
            .with_failure_threshold(3)
            .with_recovery_timeout(Duration::from_millis(1_000))
            .with_success_threshold(2),
    );
    let invocations = Arc::new(AtomicU32::new(0));

    // three consecutive failures open the circuit
    for _ in 0..3 {
        let count = invocations.clone();
        let result: Result<()> = cb
            .execute(|| async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err(boom())
            })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(cb.stats().state, CircuitState::Open);

    // a call shortly after rejects without invoking the operation
    tokio::time::sleep(Duration::from_millis(10)).await;
    let count = invocations.clone();
    let err = cb
        .execute(|| async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Circuit breaker is OPEN"));
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    // once the recovery timeout elapses the next call probes half-open;
    // with success_threshold = 2 the first success is not enough to close
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    cb.execute(|| async { Ok(()) }).await.unwrap();
    assert_eq!(cb.stats().state, CircuitState::HalfOpen);

    cb.execute(|| async { Ok(()) }).await.unwrap();
    let stats = cb.stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(invocations.load(Ordering::SeqCst) + 2, 5);
}

#[tokio::test]
async fn stats_survive_round_trips_and_serialize() {
    let cb = CircuitBreaker::new(
        "tts",
        CircuitBreakerConfig::new()
            .with_failure_threshold(2)
            .with_recovery_timeout(Duration::from_millis(50)),
    );

    let _ = cb.execute(|| async { Err::<(), _>(boom()) }).await;
    cb.execute(|| async { Ok(()) }).await.unwrap();

    let stats = cb.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.total_failures, 1);
    assert_eq!(stats.total_successes, 1);
    assert!(stats.last_failure_time.is_some());
    assert!(stats.last_success_time.is_some());

    // snapshots are plain data for whatever metrics surface embeds them
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["name"], "tts");
    assert_eq!(json["state"], "CLOSED");
    assert_eq!(json["total_requests"], 2);
}

#[tokio::test]
async fn reopened_probe_failure_requires_fresh_timeout() {
    let cb = CircuitBreaker::new(
        "scraper",
        CircuitBreakerConfig::new()
            .with_failure_threshold(1)
            .with_recovery_timeout(Duration::from_millis(80))
            .with_success_threshold(1),
    );

    let _ = cb.execute(|| async { Err::<(), _>(boom()) }).await;
    assert_eq!(cb.stats().state, CircuitState::Open);

    // probe fails: straight back to open, new recovery window
    tokio::time::sleep(Duration::from_millis(90)).await;
    let _ = cb.execute(|| async { Err::<(), _>(boom()) }).await;
    assert_eq!(cb.stats().state, CircuitState::Open);

    // still inside the fresh window: fail fast
    let err = cb.execute(|| async { Ok(()) }).await.unwrap_err();
    assert!(err.is_circuit_open());

    // and after it elapses, a successful probe closes (threshold 1)
    tokio::time::sleep(Duration::from_millis(90)).await;
    cb.execute(|| async { Ok(()) }).await.unwrap();
    assert_eq!(cb.stats().state, CircuitState::Closed);
}
