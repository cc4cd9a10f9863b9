use crate::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Operating state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation; requests pass through.
    Closed,
    /// Dependency judged unhealthy; requests fail fast.
    Open,
    /// Trial recovery; requests pass through while a success streak is counted.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before probing recovery.
    pub recovery_timeout: Duration,
    /// Consecutive half-open successes required to close again.
    pub success_threshold: u32,
    /// Reporting window surfaced through stats. The breaker itself counts
    /// consecutive outcomes rather than a sliding window.
    pub monitoring_period: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            monitoring_period: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the consecutive-failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the recovery timeout
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Set the half-open success threshold
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Set the stats reporting window
    pub fn with_monitoring_period(mut self, period: Duration) -> Self {
        self.monitoring_period = period;
        self
    }
}

/// Immutable snapshot of a breaker's counters and state.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Epoch milliseconds of the last failure, if any.
    pub last_failure_time: Option<u64>,
    /// Epoch milliseconds of the last success, if any.
    pub last_success_time: Option<u64>,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub success_threshold: u32,
    pub monitoring_period_ms: u64,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    /// Monotonic instant of the last failure, used for the recovery gate.
    last_failure: Option<Instant>,
    /// Wall-clock mirrors of the timestamps, for reporting only.
    last_failure_time: Option<u64>,
    last_success_time: Option<u64>,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            last_failure_time: None,
            last_success_time: None,
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
        }
    }
}

/// Per-dependency circuit breaker.
///
/// State machine:
///
/// ```text
/// CLOSED --failure_count >= threshold--> OPEN
/// OPEN --recovery timeout elapsed & next call--> HALF_OPEN
/// HALF_OPEN --success_count >= threshold--> CLOSED
/// HALF_OPEN --any failure--> OPEN
/// ```
///
/// The breaker is a gate, not a lock: concurrent `execute` calls proceed
/// independently. Half-open probing is deliberately not serialized, so
/// concurrent probes can overshoot the success threshold before the
/// transition to CLOSED is observed by every caller. Counters stay
/// mutex-consistent; the overshoot only means a few extra probe requests
/// reach a recovering dependency.
pub struct CircuitBreaker {
    name: String,
    cfg: CircuitBreakerConfig,
    inner: std::sync::Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, cfg: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            cfg,
            inner: std::sync::Mutex::new(Inner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    /// Run `operation` through the breaker.
    ///
    /// Performs exactly one invocation of `operation`, or zero when the
    /// circuit is open and the recovery timeout has not elapsed (the
    /// fail-fast path, which returns [`Error::CircuitOpen`]). Retries are a
    /// separate composed layer; see [`crate::resilience::retry`].
    ///
    /// On the non-short-circuit path the operation's result, success or
    /// failure, is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.preflight()?;
        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }

    /// Gate check before invoking the operation. Counts the request and,
    /// when open, either rejects or moves to half-open probing.
    fn preflight(&self) -> Result<()> {
        let mut st = self.lock();
        st.total_requests = st.total_requests.saturating_add(1);

        if st.state == CircuitState::Open {
            let elapsed = st.last_failure.map(|t| t.elapsed());
            let waited_out = elapsed
                .map(|e| e >= self.cfg.recovery_timeout)
                .unwrap_or(true);
            if !waited_out {
                let retry_in_ms = elapsed
                    .map(|e| {
                        self.cfg
                            .recovery_timeout
                            .saturating_sub(e)
                            .as_millis() as u64
                    })
                    .unwrap_or(0);
                debug!(
                    breaker = %self.name,
                    retry_in_ms,
                    "rejecting call while circuit is open"
                );
                return Err(Error::CircuitOpen {
                    name: self.name.clone(),
                    retry_in_ms,
                });
            }
            st.state = CircuitState::HalfOpen;
            st.success_count = 0;
            debug!(breaker = %self.name, "recovery timeout elapsed, probing half-open");
        }
        Ok(())
    }

    fn on_success(&self) {
        let mut st = self.lock();
        st.total_successes = st.total_successes.saturating_add(1);
        st.success_count = st.success_count.saturating_add(1);
        st.last_success_time = Some(epoch_ms());

        match st.state {
            CircuitState::HalfOpen if st.success_count >= self.cfg.success_threshold => {
                st.state = CircuitState::Closed;
                st.failure_count = 0;
                info!(
                    breaker = %self.name,
                    successes = st.success_count,
                    "circuit closed after recovery probe"
                );
            }
            // A single success forgives prior failures; no leaky-bucket decay.
            CircuitState::Closed => st.failure_count = 0,
            _ => {}
        }
    }

    fn on_failure(&self) {
        let mut st = self.lock();
        st.total_failures = st.total_failures.saturating_add(1);
        st.failure_count = st.failure_count.saturating_add(1);
        st.last_failure = Some(Instant::now());
        st.last_failure_time = Some(epoch_ms());

        let should_open = matches!(st.state, CircuitState::Closed | CircuitState::HalfOpen)
            && st.failure_count >= self.cfg.failure_threshold;
        if should_open {
            let was_probing = st.state == CircuitState::HalfOpen;
            st.state = CircuitState::Open;
            warn!(
                breaker = %self.name,
                failures = st.failure_count,
                recovery_timeout_ms = self.cfg.recovery_timeout.as_millis() as u64,
                was_probing,
                "circuit opened"
            );
        }
    }

    /// Snapshot all counters and the current state. Never mutates.
    pub fn stats(&self) -> CircuitBreakerStats {
        let now = Instant::now();
        let st = self.lock();
        let open_remaining_ms = match (st.state, st.last_failure) {
            (CircuitState::Open, Some(at)) => {
                let reopen_at = at + self.cfg.recovery_timeout;
                (reopen_at > now).then(|| (reopen_at - now).as_millis() as u64)
            }
            _ => None,
        };
        CircuitBreakerStats {
            name: self.name.clone(),
            state: st.state,
            failure_count: st.failure_count,
            success_count: st.success_count,
            last_failure_time: st.last_failure_time,
            last_success_time: st.last_success_time,
            total_requests: st.total_requests,
            total_failures: st.total_failures,
            total_successes: st.total_successes,
            failure_threshold: self.cfg.failure_threshold,
            recovery_timeout_ms: self.cfg.recovery_timeout.as_millis() as u64,
            success_threshold: self.cfg.success_threshold,
            monitoring_period_ms: self.cfg.monitoring_period.as_millis() as u64,
            open_remaining_ms,
        }
    }

    /// Force the breaker back to CLOSED with zeroed window counters and
    /// timestamps. Lifetime totals are untouched: this is the operational
    /// "unstick a stuck circuit" action, not a reinitialization.
    pub fn reset(&self) {
        let mut st = self.lock();
        st.state = CircuitState::Closed;
        st.failure_count = 0;
        st.success_count = 0;
        st.last_failure = None;
        st.last_failure_time = None;
        st.last_success_time = None;
        info!(breaker = %self.name, "circuit manually reset to closed");
    }

    /// Every write under the lock is a plain assignment, so a poisoned
    /// guard still holds consistent state; recover it rather than let a
    /// bookkeeping failure displace the wrapped operation's own result.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(st) => st,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
