//! Retry and backoff execution for upstream calls.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! server errors, connection failures), exponential backoff decisions and the
//! user-facing message table, so that every call site wrapping a flaky
//! upstream API shares one consistent policy.
//!
//! The entry point is [`run_with_retry`]: it takes the operation as a value and
//! makes the retry boundary explicit at the call site.

mod classify;
mod error;
mod failure;
mod message;
mod policy;
mod run;

pub use classify::{classify, classify_http_status, ErrorClass, ErrorKind};
pub use error::{UpstreamError, UpstreamFailure};
pub use failure::ClassifiedFailure;
pub use message::{exhausted_message, status_message, user_message, DEFAULT_MESSAGE};
pub use policy::{PolicyError, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, run_with_retry_cancellable, run_with_retry_observed, AttemptRecord};
