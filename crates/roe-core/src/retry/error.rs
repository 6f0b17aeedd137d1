//! Upstream failure vocabulary understood by the classifier.

use std::io;

/// What an error must tell the executor so it can be classified.
///
/// Implement this for the error type of whatever client the operation wraps.
/// Everything defaults to "not present", which classifies as terminal.
pub trait UpstreamFailure {
    /// HTTP-like status code, when the upstream answered with one.
    fn status(&self) -> Option<u16> {
        None
    }

    /// True when the attempt ran out of time.
    fn is_timeout(&self) -> bool {
        false
    }

    /// True for connection-level faults (DNS, refused, reset).
    fn is_connection(&self) -> bool {
        false
    }
}

/// General-purpose upstream error for callers without their own error type.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    /// The attempt did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),
    /// The upstream could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Transport I/O error, classified by its kind.
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// Anything else (bad input, undecodable response).
    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    pub fn http(status: u16, reason: impl Into<String>) -> Self {
        UpstreamError::Status {
            status,
            reason: reason.into(),
        }
    }

    pub fn timeout(what: impl Into<String>) -> Self {
        UpstreamError::Timeout(what.into())
    }

    pub fn connection(what: impl Into<String>) -> Self {
        UpstreamError::Connection(what.into())
    }

    pub fn other(what: impl Into<String>) -> Self {
        UpstreamError::Other(what.into())
    }
}

impl From<tokio::time::error::Elapsed> for UpstreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        UpstreamError::Timeout("attempt deadline elapsed".to_string())
    }
}

impl UpstreamFailure for UpstreamError {
    fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_timeout(&self) -> bool {
        match self {
            UpstreamError::Timeout(_) => true,
            UpstreamError::Io(e) => e.is_timeout(),
            _ => false,
        }
    }

    fn is_connection(&self) -> bool {
        match self {
            UpstreamError::Connection(_) => true,
            UpstreamError::Io(e) => e.is_connection(),
            _ => false,
        }
    }
}

impl UpstreamFailure for io::Error {
    fn is_timeout(&self) -> bool {
        self.kind() == io::ErrorKind::TimedOut
    }

    fn is_connection(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::AddrNotAvailable
        )
    }
}

impl<E: UpstreamFailure + ?Sized> UpstreamFailure for Box<E> {
    fn status(&self) -> Option<u16> {
        (**self).status()
    }

    fn is_timeout(&self) -> bool {
        (**self).is_timeout()
    }

    fn is_connection(&self) -> bool {
        (**self).is_connection()
    }
}
