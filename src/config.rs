//! Per-dependency reliability profiles and the default provider table.
//!
//! Thresholds are tuned per dependency based on expected latency and
//! reliability: a slow third-party media API tolerates more consecutive
//! failures and waits longer before probing recovery than the backing
//! database, which is expected to answer quickly and to recover quickly.

use crate::resilience::circuit_breaker::CircuitBreakerConfig;
use crate::resilience::retry::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Reliability profile for a class of dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyProfile {
    /// Third-party generation APIs (image, video, TTS, scraping).
    ExternalApi,
    /// The backing Postgres-compatible database.
    Database,
    /// Local filesystem staging (downloads, temp media).
    Filesystem,
}

impl DependencyProfile {
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::ExternalApi => RetryPolicy::external_api(),
            Self::Database => RetryPolicy::database(),
            Self::Filesystem => RetryPolicy::filesystem(),
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        match self {
            Self::ExternalApi => CircuitBreakerConfig::new()
                .with_failure_threshold(5)
                .with_recovery_timeout(Duration::from_secs(60))
                .with_success_threshold(2),
            Self::Database => CircuitBreakerConfig::new()
                .with_failure_threshold(3)
                .with_recovery_timeout(Duration::from_secs(5))
                .with_success_threshold(2)
                .with_monitoring_period(Duration::from_secs(30)),
            Self::Filesystem => CircuitBreakerConfig::new()
                .with_failure_threshold(3)
                .with_recovery_timeout(Duration::from_secs(10))
                .with_success_threshold(1),
        }
    }
}

/// One row of the default dependency table.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    pub name: &'static str,
    pub profile: DependencyProfile,
    pub breaker: CircuitBreakerConfig,
}

impl DependencySpec {
    fn new(name: &'static str, profile: DependencyProfile) -> Self {
        Self {
            name,
            profile,
            breaker: profile.breaker_config(),
        }
    }

    fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }
}

/// The fixed set of external dependencies the backend talks to, with
/// per-service breaker tuning.
pub fn default_dependencies() -> Vec<DependencySpec> {
    use DependencyProfile::*;
    vec![
        DependencySpec::new("replicate", ExternalApi),
        DependencySpec::new("kie", ExternalApi),
        // BFL renders are slow; give probes more room before reopening
        DependencySpec::new("bfl", ExternalApi).with_breaker(
            ExternalApi
                .breaker_config()
                .with_recovery_timeout(Duration::from_secs(90)),
        ),
        DependencySpec::new("elevenlabs", ExternalApi).with_breaker(
            ExternalApi
                .breaker_config()
                .with_recovery_timeout(Duration::from_secs(30)),
        ),
        // HuggingFace endpoints cold-start; trip earlier, probe later
        DependencySpec::new("huggingface", ExternalApi).with_breaker(
            ExternalApi
                .breaker_config()
                .with_failure_threshold(3)
                .with_recovery_timeout(Duration::from_secs(120)),
        ),
        DependencySpec::new("apify", ExternalApi).with_breaker(
            ExternalApi
                .breaker_config()
                .with_failure_threshold(3),
        ),
        DependencySpec::new("supabase", Database),
    ]
}

/// Parse `var` from the environment, falling back to `default` when unset
/// or unparsable.
pub(crate) fn env_or<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_api_outlasts_database() {
        let api = DependencyProfile::ExternalApi.breaker_config();
        let db = DependencyProfile::Database.breaker_config();
        assert!(api.failure_threshold > db.failure_threshold);
        assert!(api.recovery_timeout > db.recovery_timeout);
    }

    #[test]
    fn default_table_covers_known_providers() {
        let deps = default_dependencies();
        let names: Vec<_> = deps.iter().map(|d| d.name).collect();
        for expected in ["replicate", "elevenlabs", "huggingface", "supabase"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        // no duplicate names
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());

        let supabase = deps.iter().find(|d| d.name == "supabase").unwrap();
        assert_eq!(supabase.profile, DependencyProfile::Database);
        assert_eq!(supabase.profile.retry_policy().max_attempts, 5);
    }

    #[test]
    fn env_or_falls_back_on_garbage() {
        std::env::set_var("AI_RESILIENCE_TEST_KNOB", "not-a-number");
        assert_eq!(env_or("AI_RESILIENCE_TEST_KNOB", 7u64), 7);
        std::env::remove_var("AI_RESILIENCE_TEST_KNOB");
        assert_eq!(env_or("AI_RESILIENCE_TEST_KNOB", 7u64), 7);
    }
}
