//! Per-dependency reliable client wrappers.
//!
//! One [`GuardedClient`] exists per external dependency, composing that
//! dependency's shared [`CircuitBreaker`] with a [`RetryPolicy`] to perform
//! one logical remote operation. The breaker wraps the whole retry loop, so
//! local re-attempts are invisible to it until the final outcome:
//!
//! ```text
//! caller -> GuardedClient::call
//!        -> CircuitBreaker::execute (gate: fail fast when OPEN)
//!        -> retry loop (backoff between transient failures)
//!        -> operation (one HTTP request per attempt)
//! ```
//!
//! [`GuardedHttp`] binds a guard to a [`ProviderHttpClient`] for the common
//! create-job / poll-status / health-check shape of the generation APIs.

pub mod http;

pub use http::ProviderHttpClient;

use crate::classify::default_retry_condition;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerStats};
use crate::resilience::registry::BreakerRegistry;
use crate::resilience::retry::{execute_with_retry, RetryPolicy};
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;

/// A named dependency's breaker + retry policy, applied to arbitrary
/// async operations.
pub struct GuardedClient {
    name: String,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl GuardedClient {
    pub fn new(name: impl Into<String>, breaker: Arc<CircuitBreaker>, retry: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            breaker,
            retry,
        }
    }

    /// Resolve the dependency's shared breaker from `registry` and pair it
    /// with `retry`.
    pub fn from_registry(
        registry: &BreakerRegistry,
        name: &str,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let breaker = registry.breaker(name)?;
        Ok(Self::new(name, breaker, retry))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        self.breaker.stats()
    }

    /// Run `operation` through breaker and retry loop.
    ///
    /// Transient failures are retried per the policy. When the attempt
    /// budget runs out, the terminal error is wrapped as
    /// `"<dependency>.<op_name>: <message>"` so callers can tell which
    /// logical operation gave up; a non-retryable failure on an earlier
    /// attempt (e.g. a 404) keeps its original shape. A fail-fast rejection
    /// from the open breaker is returned as-is, before any attempt is made.
    pub async fn call<T, F, Fut>(&self, op_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let qualified = format!("{}.{}", self.name, op_name);
        let qualified = &qualified;
        let operation = &operation;
        let retry = &self.retry;
        self.breaker
            .execute(move || async move {
                let outcome = execute_with_retry(operation, retry, default_retry_condition).await;
                let attempts = outcome.attempts;
                outcome.result.map_err(|err| {
                    if attempts >= retry.max_attempts {
                        Error::RetriesExhausted {
                            operation: qualified.clone(),
                            attempts,
                            source: Box::new(err),
                        }
                    } else {
                        err
                    }
                })
            })
            .await
    }

    /// Run `operation` through the breaker without local retries. Used for
    /// probes where a second attempt would mask the signal.
    pub async fn call_once<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.breaker.execute(operation).await
    }
}

/// A guarded HTTP client for one generation provider.
pub struct GuardedHttp {
    guard: GuardedClient,
    http: ProviderHttpClient,
}

impl GuardedHttp {
    /// Wire `name`'s registered breaker to an HTTP client rooted at
    /// `base_url`, with the external-API retry profile.
    pub fn new(registry: &BreakerRegistry, name: &str, base_url: &str) -> Result<Self> {
        Ok(Self {
            guard: GuardedClient::from_registry(registry, name, RetryPolicy::external_api())?,
            http: ProviderHttpClient::new(name, base_url)?,
        })
    }

    /// Override the retry profile (e.g. for a latency-sensitive poll path).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.guard.retry = retry;
        self
    }

    /// Create a resource on the provider (submit a generation job).
    pub async fn create(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        self.guard
            .call("create", move || self.http.post_json(path, body))
            .await
    }

    /// Fetch the status of a previously created resource.
    pub async fn fetch_status(&self, path: &str) -> Result<serde_json::Value> {
        self.guard
            .call("fetch_status", move || self.http.get_json(path))
            .await
    }

    /// Single-attempt health probe through the breaker.
    pub async fn health(&self, path: &str) -> Result<()> {
        self.guard.call_once(move || self.http.health_check(path)).await
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        self.guard.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FailureClass;
    use crate::resilience::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_registry(threshold: u32) -> BreakerRegistry {
        let mut registry = BreakerRegistry::new();
        registry.register(
            "svc",
            CircuitBreakerConfig::new()
                .with_failure_threshold(threshold)
                .with_recovery_timeout(Duration::from_secs(60)),
        );
        registry
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::external_api()
            .with_max_attempts(attempts)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    fn remote(status: u16) -> Error {
        let class = FailureClass::from_http_status(status);
        Error::Remote {
            status,
            class: class.name().to_string(),
            message: "test".to_string(),
            retryable: class.retryable(),
            retry_after_ms: None,
        }
    }

    #[tokio::test]
    async fn retries_are_one_breaker_outcome() {
        let registry = fast_registry(2);
        let guard = GuardedClient::from_registry(&registry, "svc", fast_retry(3)).unwrap();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = guard
            .call("create", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(remote(503))
            })
            .await
            .unwrap_err();

        // three HTTP attempts, but exactly one failure recorded by the breaker
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let stats = guard.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.state, CircuitState::Closed);

        assert!(err.to_string().starts_with("svc.create: "));
        match err {
            Error::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn open_breaker_rejects_before_any_attempt() {
        let registry = fast_registry(1);
        let guard = GuardedClient::from_registry(&registry, "svc", fast_retry(3)).unwrap();

        let _ = guard
            .call("create", || async { Err::<(), _>(remote(500)) })
            .await;
        assert_eq!(guard.stats().state, CircuitState::Open);

        let calls = AtomicU32::new(0);
        let calls = &calls;
        let err = guard
            .call("create", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(err.is_circuit_open());
    }

    #[tokio::test]
    async fn terminal_errors_skip_retries() {
        let registry = fast_registry(5);
        let guard = GuardedClient::from_registry(&registry, "svc", fast_retry(3)).unwrap();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = guard
            .call("create", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(remote(404))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // not exhausted, so the 404 surfaces unwrapped
        match err {
            Error::Remote { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn call_once_makes_a_single_attempt() {
        let registry = fast_registry(5);
        let guard = GuardedClient::from_registry(&registry, "svc", fast_retry(3)).unwrap();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let _ = guard
            .call_once(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(remote(503))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.stats().total_failures, 1);
    }
}
