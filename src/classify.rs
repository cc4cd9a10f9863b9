//! 失败分类：将 HTTP 状态码与传输错误映射为可重试/终止语义。
//!
//! Failure classification.
//!
//! This module is the concrete form of the default retry condition: every
//! outbound provider failure is sorted into a [`FailureClass`], and the class
//! decides whether another attempt is warranted. The mapping follows the
//! semantics observed across the generation providers this backend talks to:
//! rate limits (429), request timeouts (408), and server-side errors (5xx)
//! are transient; every other 4xx is a caller mistake and terminal.
//!
//! ## Example
//!
//! ```rust
//! use ai_resilience_rust::classify::FailureClass;
//!
//! let class = FailureClass::from_http_status(429);
//! assert_eq!(class, FailureClass::RateLimited);
//! assert!(class.retryable());
//! assert_eq!(class.name(), "rate");
//! ```

use crate::Error;

/// Coarse failure category for an outbound provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// 4xx (except 408/429): malformed request, auth, missing resource
    Client,
    /// 429: request rate or quota limit hit
    RateLimited,
    /// 5xx: provider-side failure, including overload (503/529)
    Server,
    /// 408/504: the request timed out before a response arrived
    Timeout,
    /// Connection-level failure: reset, refused, DNS, broken pipe
    Network,
    /// Anything that could not be classified
    Unknown,
}

impl FailureClass {
    /// Returns the category name surfaced in [`Error::Remote::class`]
    /// (`"client"`, `"rate"`, `"server"`, `"timeout"`, `"network"`, `"unknown"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::RateLimited => "rate",
            Self::Server => "server",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }

    /// Returns whether this class of failure is worth another attempt.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Server | Self::Timeout | Self::Network
        )
    }

    /// Maps an HTTP status code to the most likely `FailureClass`.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            400..=499 => Self::Client,
            // 529 is Anthropic-style overloaded; non-standard but seen in the wild
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Maps an I/O error kind to a `FailureClass`.
    pub fn from_io_kind(kind: std::io::ErrorKind) -> Self {
        use std::io::ErrorKind;
        match kind {
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Self::Network,
            ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

/// Default retry condition for the external-API profile.
///
/// Retryable: network resets, DNS/connect failures, timeouts, HTTP 5xx,
/// 429 and 408. Terminal: all other 4xx, fail-fast rejections from an open
/// breaker, and anything already renamed by a retry wrapper.
pub fn default_retry_condition(error: &Error) -> bool {
    match error {
        // Never retry past an open circuit; the point is to stop calling.
        Error::CircuitOpen { .. } => false,
        Error::Remote { retryable, .. } => *retryable,
        Error::Http(e) => {
            if e.is_timeout() || e.is_connect() {
                return true;
            }
            match e.status() {
                Some(status) => FailureClass::from_http_status(status.as_u16()).retryable(),
                None => false,
            }
        }
        Error::Io(e) => FailureClass::from_io_kind(e.kind()).retryable(),
        Error::RetriesExhausted { .. } => false,
        Error::Configuration { .. }
        | Error::Runtime { .. }
        | Error::Serialization(_) => false,
    }
}
