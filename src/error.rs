use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Additional context about the error (e.g., provider payload, attempted path)
    pub details: Option<String>,
    /// Source of the error (e.g., "circuit_breaker", "retry_executor")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type for the reliability core.
///
/// The guard layers never transform an error that came out of a wrapped
/// operation. The only errors synthesized here are `CircuitOpen` (the
/// fail-fast path, produced before the operation runs) and
/// `RetriesExhausted` (the named rename applied by the convenience retry
/// wrappers once all attempts are spent).
#[derive(Debug, Error)]
pub enum Error {
    /// Fail-fast rejection: the breaker is OPEN and the recovery timeout has
    /// not yet elapsed. The wrapped operation was never invoked.
    #[error("Circuit breaker is OPEN for {name} (retry in {retry_in_ms}ms)")]
    CircuitOpen { name: String, retry_in_ms: u64 },

    /// A non-2xx response from a provider, pre-classified for retry decisions.
    #[error("Remote error: HTTP {status} ({class}): {message}")]
    Remote {
        status: u16,
        class: String,
        message: String,
        retryable: bool,
        retry_after_ms: Option<u64>,
    },

    /// Transport-level failure: connect, DNS resolution, timeout, body decode.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Terminal outcome of a named retry loop; Display keeps the
    /// `<operation>: <message>` shape callers match on.
    #[error("{operation}: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// True when this is the breaker's fail-fast rejection rather than a
    /// failure of the underlying operation. Callers use this to distinguish
    /// "service temporarily unavailable" messaging from real provider errors.
    pub fn is_circuit_open(&self) -> bool {
        match self {
            Error::CircuitOpen { .. } => true,
            Error::RetriesExhausted { source, .. } => source.is_circuit_open(),
            _ => false,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}
