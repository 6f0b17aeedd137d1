//! User-facing messages for upstream status codes.

use super::classify::ErrorKind;

/// Message for any status without an entry in the table.
pub const DEFAULT_MESSAGE: &str = "Upstream API error.";

/// Status → message table. Read-only; consulted through [`status_message`].
const STATUS_MESSAGES: &[(u16, &str)] = &[
    (401, "Authentication required. Please re-authenticate."),
    (403, "Access denied. Check permissions."),
    (404, "Resource not found. It may have been deleted."),
    (429, "Rate limit exceeded. Please wait a moment and try again."),
    // 500 and 503 only show up in per-attempt logs; exhaustion has its own text.
    (500, "Service error. Retrying…"),
    (503, "Service temporarily unavailable. Retrying…"),
];

/// Look up the message for a status code.
pub fn status_message(status: u16) -> Option<&'static str> {
    STATUS_MESSAGES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, msg)| *msg)
}

/// Message for a failure with an optional status, falling back to [`DEFAULT_MESSAGE`].
pub fn user_message(status: Option<u16>) -> &'static str {
    status.and_then(status_message).unwrap_or(DEFAULT_MESSAGE)
}

/// Message shown after every attempt failed with a retryable error.
pub fn exhausted_message(kind: ErrorKind, attempts: u32) -> String {
    let base = match kind {
        ErrorKind::Throttled => user_message(Some(429)),
        ErrorKind::ServerError(_) => "Upstream service unavailable.",
        ErrorKind::Timeout => "Upstream request timed out.",
        ErrorKind::Connection => "Could not reach upstream service.",
        ErrorKind::Rejected(_) | ErrorKind::Other => DEFAULT_MESSAGE,
    };
    let noun = if attempts == 1 { "attempt" } else { "attempts" };
    format!("{base} (gave up after {attempts} {noun})")
}
