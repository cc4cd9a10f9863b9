//! 弹性模式模块：熔断器、重试执行器与按依赖命名的注册表。
//!
//! # Resilience Primitives Module
//!
//! Every outbound call to an unreliable external service passes through
//! this layer. It provides the three composable primitives of the
//! reliability core:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Per-dependency CLOSED / OPEN / HALF_OPEN gate with fail-fast |
//! | [`retry`] | Exponential-backoff attempt loop with retryability filtering |
//! | [`registry`] | Named, shared breakers with aggregate stats and reset-all |
//!
//! ## Composition
//!
//! The breaker does not retry and the retry loop does not gate: a guarded
//! call wraps the whole retry loop in a single breaker execution, so the
//! breaker only sees the final outcome of each logical operation:
//!
//! ```rust
//! use ai_resilience_rust::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use ai_resilience_rust::resilience::retry::{execute_with_retry, RetryPolicy};
//! use ai_resilience_rust::classify::default_retry_condition;
//!
//! # async fn demo() -> ai_resilience_rust::Result<()> {
//! let breaker = CircuitBreaker::new("replicate", CircuitBreakerConfig::default());
//! let policy = RetryPolicy::external_api();
//!
//! let policy = &policy;
//! let value = breaker
//!     .execute(move || async move {
//!         let outcome =
//!             execute_with_retry(|| async { Ok(42) }, policy, default_retry_condition).await;
//!         outcome.result
//!     })
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod registry;
pub mod retry;
