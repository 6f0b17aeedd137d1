//! Classify upstream failures into retry policy error kinds.

use super::error::UpstreamFailure;

/// Whether a failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient: rate limiting, server errors, timeouts, connection faults.
    Retryable,
    /// Everything else, including malformed requests and missing resources.
    Terminal,
}

/// High-level classification of an error for retry purposes.
///
/// Callers map their own failures onto these kinds through
/// [`UpstreamFailure`]; the executor only ever looks at the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream asked us to slow down (429).
    Throttled,
    /// Upstream failed on its side (5xx).
    ServerError(u16),
    /// Any other status: the request itself was refused.
    Rejected(u16),
    /// Operation timed out.
    Timeout,
    /// Network-level failure (DNS, refused, reset).
    Connection,
    /// No status and no recognised transport fault.
    Other,
}

impl ErrorKind {
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::Throttled
            | ErrorKind::ServerError(_)
            | ErrorKind::Timeout
            | ErrorKind::Connection => ErrorClass::Retryable,
            ErrorKind::Rejected(_) | ErrorKind::Other => ErrorClass::Terminal,
        }
    }

    pub fn is_retryable(self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    /// Status code carried by this kind, if any.
    pub fn status(self) -> Option<u16> {
        match self {
            ErrorKind::Throttled => Some(429),
            ErrorKind::ServerError(code) | ErrorKind::Rejected(code) => Some(code),
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Other => None,
        }
    }
}

/// Classify an HTTP-like status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 => ErrorKind::Throttled,
        500..=599 => ErrorKind::ServerError(code),
        _ => ErrorKind::Rejected(code),
    }
}

/// Classify a failure. A status code, when present, decides on its own;
/// timeout and connection flags are only consulted without one.
pub fn classify<E: UpstreamFailure + ?Sized>(e: &E) -> ErrorKind {
    if let Some(code) = e.status() {
        return classify_http_status(code);
    }
    if e.is_timeout() {
        return ErrorKind::Timeout;
    }
    if e.is_connection() {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}
