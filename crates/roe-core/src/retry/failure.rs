//! Final failure returned by the retry executor.

use std::fmt;
use std::time::Duration;

use super::classify::ErrorKind;

/// Why an execution ended without a value.
///
/// `Terminal` and `Exhausted` are kept apart so callers can tell "rejected
/// outright" from "gave up after retrying".
#[derive(Debug)]
pub enum ClassifiedFailure<E> {
    /// A non-retryable error; no further attempts were made.
    Terminal {
        error: E,
        kind: ErrorKind,
        attempts: u32,
        message: &'static str,
    },
    /// Every attempt failed with a retryable error.
    Exhausted {
        last_error: E,
        kind: ErrorKind,
        attempts: u32,
        /// Sum of the backoff sleeps between attempts.
        total_wait: Duration,
        message: String,
    },
    /// The caller cancelled while an attempt or a backoff sleep was pending.
    Cancelled {
        last_error: Option<E>,
        attempts: u32,
        total_wait: Duration,
    },
}

impl<E> ClassifiedFailure<E> {
    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            ClassifiedFailure::Terminal { attempts, .. }
            | ClassifiedFailure::Exhausted { attempts, .. }
            | ClassifiedFailure::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Human-readable message for the user.
    pub fn message(&self) -> &str {
        match self {
            ClassifiedFailure::Terminal { message, .. } => *message,
            ClassifiedFailure::Exhausted { message, .. } => message.as_str(),
            ClassifiedFailure::Cancelled { .. } => "Operation cancelled.",
        }
    }

    /// Status code of the error that ended the execution, if it had one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifiedFailure::Terminal { kind, .. } | ClassifiedFailure::Exhausted { kind, .. } => {
                kind.status()
            }
            ClassifiedFailure::Cancelled { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClassifiedFailure::Terminal { kind, .. } | ClassifiedFailure::Exhausted { kind, .. } => {
                Some(*kind)
            }
            ClassifiedFailure::Cancelled { .. } => None,
        }
    }

    /// The underlying error (the last one observed, for exhaustion and cancellation).
    pub fn error(&self) -> Option<&E> {
        match self {
            ClassifiedFailure::Terminal { error, .. } => Some(error),
            ClassifiedFailure::Exhausted { last_error, .. } => Some(last_error),
            ClassifiedFailure::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    pub fn into_error(self) -> Option<E> {
        match self {
            ClassifiedFailure::Terminal { error, .. } => Some(error),
            ClassifiedFailure::Exhausted { last_error, .. } => Some(last_error),
            ClassifiedFailure::Cancelled { last_error, .. } => last_error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClassifiedFailure::Terminal { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, ClassifiedFailure::Exhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClassifiedFailure::Cancelled { .. })
    }
}

impl<E: fmt::Display> fmt::Display for ClassifiedFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifiedFailure::Terminal { error, message, .. } => write!(f, "{} ({})", message, error),
            ClassifiedFailure::Exhausted {
                last_error,
                message,
                ..
            } => write!(f, "{} ({})", message, last_error),
            ClassifiedFailure::Cancelled { attempts, .. } => {
                write!(f, "operation cancelled after {} attempt(s)", attempts)
            }
        }
    }
}

impl<E> std::error::Error for ClassifiedFailure<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
