use crate::classify::default_retry_condition;
use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Backoff and attempt policy for one logical remote operation.
///
/// No shared mutable state; a fresh attempt loop is created per call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total invocations permitted, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Hard ceiling on the computed delay, applied before jitter.
    pub max_delay: Duration,
    pub exponential_base: f64,
    /// When enabled, each delay is multiplied by a uniform factor in
    /// `[0.5, 1.0]` to avoid synchronized retry storms.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::external_api()
    }
}

impl RetryPolicy {
    /// Aggressive profile for third-party generation APIs: 3 attempts,
    /// 1s base delay, doubling, 30s cap, jittered.
    pub fn external_api() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter: true,
        }
    }

    /// Fast profile for the backing database: 5 attempts, 500ms base,
    /// smaller backoff multiplier, 5s cap.
    pub fn database() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            exponential_base: 1.5,
            jitter: true,
        }
    }

    /// Short profile for local filesystem operations: 3 attempts,
    /// 200ms base, 2s cap.
    pub fn filesystem() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            exponential_base: 2.0,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Pre-jitter delay before attempt `attempt + 1`, i.e. after the
    /// `attempt`-th invocation failed (1-based):
    /// `min(base_delay * exponential_base^(attempt - 1), max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.base_delay.min(self.max_delay);
        }
        let factor = self.exponential_base.max(1.0).powi(attempt as i32 - 1);
        let delay_ms = (self.base_delay.as_millis() as f64 * factor)
            .min(self.max_delay.as_millis() as f64)
            .max(0.0);
        Duration::from_millis(delay_ms as u64)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        delay.mul_f64(factor)
    }
}

/// Outcome of a retry loop. Exactly one of ok/err is populated, and
/// `attempts` always reflects the number of invocations actually made.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T>,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Attempt `operation` up to `policy.max_attempts` times, sleeping between
/// attempts per the policy's exponential backoff. `is_retryable` filters
/// which failures qualify for another attempt; the first success or first
/// terminal failure ends the loop.
///
/// `max_attempts == 0` yields zero invocations and an immediate failure
/// outcome rather than an error from the loop itself.
pub async fn execute_with_retry<T, F, Fut>(
    operation: F,
    policy: &RetryPolicy,
    is_retryable: impl Fn(&Error) -> bool,
) -> RetryOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    if policy.max_attempts == 0 {
        return RetryOutcome {
            result: Err(Error::configuration_with_context(
                "retry policy permits zero attempts",
                crate::ErrorContext::new().with_source("retry_executor"),
            )),
            attempts: 0,
            elapsed: started.elapsed(),
        };
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    elapsed: started.elapsed(),
                };
            }
            Err(err) => {
                if attempt >= policy.max_attempts || !is_retryable(&err) {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    };
                }
                let delay = policy.jittered(policy.delay_for_attempt(attempt));
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Retry `operation` with the external-API profile and the default retry
/// condition. When every permitted attempt fails, the terminal error is
/// wrapped as `"<operation_name>: <message>"`; a non-retryable failure on
/// an earlier attempt comes back unwrapped.
pub async fn retry_external_api<T, F, Fut>(operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_policy(operation_name, RetryPolicy::external_api(), operation).await
}

/// Retry `operation` with the database profile; see [`retry_external_api`].
pub async fn retry_database<T, F, Fut>(operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_policy(operation_name, RetryPolicy::database(), operation).await
}

/// Retry `operation` with the filesystem profile; see [`retry_external_api`].
pub async fn retry_filesystem<T, F, Fut>(operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_policy(operation_name, RetryPolicy::filesystem(), operation).await
}

pub async fn retry_with_policy<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = execute_with_retry(operation, &policy, default_retry_condition).await;
    let attempts = outcome.attempts;
    outcome.result.map_err(|err| {
        // Only an exhausted attempt budget earns the wrapper; a failure
        // that was never eligible for retry keeps its original shape.
        if attempts >= policy.max_attempts {
            Error::RetriesExhausted {
                operation: operation_name.to_string(),
                attempts,
                source: Box::new(err),
            }
        } else {
            err
        }
    })
}
