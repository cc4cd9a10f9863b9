//! Named, shared circuit breakers — one per external dependency.
//!
//! All call sites for the same dependency must observe and influence the
//! same health state, so breakers are shared through a registry rather
//! than constructed ad hoc. The registry is an explicit value: the
//! application bootstraps one (usually [`global()`]) and passes it to the
//! wrappers, while tests construct isolated instances so no state leaks
//! between cases.

use crate::config::{default_dependencies, DependencySpec};
use crate::resilience::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats,
};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A mapping from dependency name to its shared [`CircuitBreaker`].
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// An empty registry; dependencies are added with [`register`](Self::register).
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the backend's known providers, each with
    /// its tuned breaker config (see [`crate::config::default_dependencies`]).
    pub fn with_default_dependencies() -> Self {
        let mut registry = Self::new();
        for DependencySpec { name, breaker, .. } in default_dependencies() {
            registry.register(name, breaker);
        }
        registry
    }

    /// Add (or replace) a named breaker and return the shared handle.
    pub fn register(&mut self, name: impl Into<String>, cfg: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let name = name.into();
        let breaker = Arc::new(CircuitBreaker::new(name.clone(), cfg));
        self.breakers.insert(name, breaker.clone());
        breaker
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).cloned()
    }

    /// Like [`get`](Self::get), but an unknown name is a configuration error.
    pub fn breaker(&self, name: &str) -> Result<Arc<CircuitBreaker>> {
        self.get(name).ok_or_else(|| {
            Error::configuration_with_context(
                format!("no circuit breaker registered for '{name}'"),
                crate::ErrorContext::new().with_source("breaker_registry"),
            )
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.breakers.keys().map(String::as_str)
    }

    /// Snapshot of every breaker, keyed by dependency name. Sorted for
    /// stable dashboard and log output.
    pub fn all_stats(&self) -> BTreeMap<String, CircuitBreakerStats> {
        self.breakers
            .iter()
            .map(|(name, cb)| (name.clone(), cb.stats()))
            .collect()
    }

    /// Force every breaker back to CLOSED. Manual operational recovery;
    /// lifetime totals survive, as with a single [`CircuitBreaker::reset`].
    pub fn reset_all(&self) {
        for cb in self.breakers.values() {
            cb.reset();
        }
    }
}

/// Process-wide registry, initialized on first use with the default
/// dependency table. Prefer passing a registry explicitly; this exists for
/// application bootstrap where one shared instance is wanted.
pub fn global() -> &'static BreakerRegistry {
    static GLOBAL: Lazy<BreakerRegistry> = Lazy::new(BreakerRegistry::with_default_dependencies);
    &GLOBAL
}
