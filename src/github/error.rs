//! Transport-level error type for API client calls.
//!
//! A [`TransportError`] means the call never produced an HTTP response: DNS
//! failure, refused connection, timeout, TLS failure, or a body that could not
//! be read. A response with a non-2xx status is *not* a transport error; that
//! is surfaced to handlers as an [`ApiResponse`](super::ApiResponse) and turned
//! into an "upstream rejected" failure by the handler layer.
//!
//! The kind decides whether the backoff wrapper may retry:
//!
//! - **Transient**: timeouts, connection resets, DNS hiccups
//! - **Permanent**: malformed URLs, unsupported requests, anything else

use std::fmt;
use thiserror::Error;

/// The kind of transport error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Safe to retry with backoff.
    Transient,

    /// Retrying the same request will fail the same way.
    Permanent,
}

impl TransportErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, TransportErrorKind::Transient)
    }
}

/// An API call that failed before a response was received.
#[derive(Debug, Error)]
pub struct TransportError {
    /// Whether the failure is worth retrying.
    pub kind: TransportErrorKind,

    /// A human-readable description of the failure.
    pub message: String,

    /// The underlying client error, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Transient => {
                write!(f, "transport error (transient): {}", self.message)
            }
            TransportErrorKind::Permanent => write!(f, "transport error: {}", self.message),
        }
    }
}

impl TransportError {
    /// Creates a transient error without an underlying source.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Transient,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a permanent error without an underlying source.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Permanent,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes an octocrab error by its message.
    ///
    /// octocrab does not expose a stable way to ask "was this a network
    /// failure", so the message is matched against known network patterns.
    /// Unrecognized errors are treated as permanent.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let message = err.to_string();
        let kind = if is_network_error(&message) {
            TransportErrorKind::Transient
        } else {
            TransportErrorKind::Permanent
        };

        Self {
            kind,
            message,
            source: Some(Box::new(err)),
        }
    }

    /// Categorizes a reqwest error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let message = err.to_string();
        let kind = if err.is_timeout() || err.is_connect() || is_network_error(&message) {
            TransportErrorKind::Transient
        } else {
            TransportErrorKind::Permanent
        };

        Self {
            kind,
            message,
            source: Some(Box::new(err)),
        }
    }
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("timed out")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
}
