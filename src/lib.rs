//! # ai-resilience-rust
//!
//! AI 生成后端的可靠性内核：为所有出站的第三方生成服务调用提供熔断、重试与可观测能力。
//!
//! Reliability core for AI generation backends. Every outbound call to an
//! unreliable external dependency — image/video generation, voice synthesis,
//! scraping, the backing database — passes through this layer on its way out.
//!
//! ## Overview
//!
//! The crate provides three composable primitives plus the per-service
//! wrapper pattern built from them:
//!
//! - **CircuitBreaker** — a per-dependency CLOSED / OPEN / HALF_OPEN state
//!   machine that fails fast when a service is judged unhealthy and probes
//!   for recovery after a timeout.
//! - **RetryPolicy** — exponential backoff with jitter and a retryability
//!   predicate over classified failures, with tuned profiles for external
//!   APIs, the database, and the filesystem.
//! - **BreakerRegistry** — named, shared breakers (one per dependency) with
//!   aggregate stats for dashboards and a reset-all for manual operational
//!   recovery.
//! - **GuardedClient / GuardedHttp** — one wrapper per external service,
//!   composing that service's breaker with a retry policy to perform one
//!   logical remote operation (create a job, poll status, health-check).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_resilience_rust::{BreakerRegistry, GuardedHttp, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = BreakerRegistry::with_default_dependencies();
//!     let replicate = GuardedHttp::new(&registry, "replicate", "https://api.replicate.com/")?;
//!
//!     let job = replicate
//!         .create("/v1/predictions", &json!({ "input": { "prompt": "a red panda" } }))
//!         .await?;
//!     println!("submitted: {job}");
//!
//!     // Health state for every dependency, for a dashboard or /health route
//!     for (name, stats) in registry.all_stats() {
//!         println!("{name}: {} ({} requests)", stats.state, stats.total_requests);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`resilience`] | Circuit breaker, retry executor, breaker registry |
//! | [`client`] | Guarded per-service client wrappers and the provider HTTP client |
//! | [`classify`] | Failure classification and the default retry condition |
//! | [`config`] | Dependency profiles and the default provider table |
//! | [`error`] | Unified error type with structured context |

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod resilience;

// Re-export main types for convenience
pub use classify::{default_retry_condition, FailureClass};
pub use client::{GuardedClient, GuardedHttp, ProviderHttpClient};
pub use config::{DependencyProfile, DependencySpec};
pub use error::{Error, ErrorContext};
pub use resilience::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use resilience::registry::{global as global_registry, BreakerRegistry};
pub use resilience::retry::{
    execute_with_retry, retry_database, retry_external_api, retry_filesystem, retry_with_policy,
    RetryOutcome, RetryPolicy,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
