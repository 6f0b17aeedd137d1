//! Retry loop: run an async operation until it succeeds or the policy says stop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::classify::{classify, ErrorClass, ErrorKind};
use super::error::UpstreamFailure;
use super::failure::ClassifiedFailure;
use super::message::{exhausted_message, user_message};
use super::policy::{RetryDecision, RetryPolicy};

/// What happened on one attempt. Handed to the observer of
/// [`run_with_retry_observed`]; never stored by the executor.
#[derive(Debug)]
pub struct AttemptRecord<'a, E> {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Backoff slept right before this attempt (zero for the first).
    pub waited: Duration,
    /// The error, when the attempt failed.
    pub error: Option<&'a E>,
    pub kind: Option<ErrorKind>,
    /// Delay before the next attempt, when one will be made.
    pub next_delay: Option<Duration>,
}

impl<E> AttemptRecord<'_, E> {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn class(&self) -> Option<ErrorClass> {
        self.kind.map(ErrorKind::class)
    }
}

/// Runs `operation` until it succeeds, fails terminally, or the policy's
/// attempt budget is spent, sleeping the policy's backoff between attempts.
///
/// Any `Ok` value ends the loop, including an empty collection. Retried
/// operations must be safe to repeat; nothing here deduplicates side effects.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, ClassifiedFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: UpstreamFailure + fmt::Display,
{
    let never = CancellationToken::new();
    run_with_retry_observed(policy, &never, |_| {}, operation).await
}

/// Like [`run_with_retry`], but gives up as soon as `cancel` fires, whether an
/// attempt or a backoff sleep is pending at the time.
pub async fn run_with_retry_cancellable<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ClassifiedFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: UpstreamFailure + fmt::Display,
{
    run_with_retry_observed(policy, cancel, |_| {}, operation).await
}

/// Cancellable retry loop that reports every attempt to `observe`, in order.
pub async fn run_with_retry_observed<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut observe: O,
    mut operation: F,
) -> Result<T, ClassifiedFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: UpstreamFailure + fmt::Display,
    O: FnMut(&AttemptRecord<'_, E>),
{
    let mut attempt = 1u32;
    let mut waited = Duration::ZERO;
    let mut total_wait = Duration::ZERO;
    let mut last_error: Option<E> = None;

    loop {
        if cancel.is_cancelled() {
            tracing::info!(attempts = attempt - 1, "upstream call cancelled before attempt");
            return Err(ClassifiedFailure::Cancelled {
                last_error,
                attempts: attempt - 1,
                total_wait,
            });
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = operation() => Some(outcome),
        };

        let error = match outcome {
            Some(Ok(value)) => {
                observe(&AttemptRecord {
                    attempt,
                    waited,
                    error: None,
                    kind: None,
                    next_delay: None,
                });
                tracing::debug!(attempt, waited_ms = millis(waited), "upstream call succeeded");
                return Ok(value);
            }
            Some(Err(e)) => e,
            None => {
                tracing::info!(attempt, "upstream call cancelled mid-attempt");
                return Err(ClassifiedFailure::Cancelled {
                    last_error,
                    attempts: attempt,
                    total_wait,
                });
            }
        };

        let kind = classify(&error);
        let decision = policy.decide(attempt, kind);
        let next_delay = match decision {
            RetryDecision::RetryAfter(d) => Some(d),
            RetryDecision::Exhausted | RetryDecision::Terminal => None,
        };
        observe(&AttemptRecord {
            attempt,
            waited,
            error: Some(&error),
            kind: Some(kind),
            next_delay,
        });

        match decision {
            RetryDecision::Terminal => {
                let message = user_message(kind.status());
                tracing::warn!(
                    attempt,
                    waited_ms = millis(waited),
                    status = ?kind.status(),
                    error = %error,
                    "upstream call failed terminally: {}",
                    message
                );
                return Err(ClassifiedFailure::Terminal {
                    error,
                    kind,
                    attempts: attempt,
                    message,
                });
            }
            RetryDecision::Exhausted => {
                let message = exhausted_message(kind, attempt);
                tracing::error!(
                    attempts = attempt,
                    total_wait_ms = millis(total_wait),
                    kind = ?kind,
                    error = %error,
                    "{}",
                    message
                );
                return Err(ClassifiedFailure::Exhausted {
                    last_error: error,
                    kind,
                    attempts: attempt,
                    total_wait,
                    message,
                });
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    attempt,
                    waited_ms = millis(waited),
                    status = ?kind.status(),
                    delay_ms = millis(delay),
                    error = %error,
                    "{}",
                    retry_note(kind)
                );
                last_error = Some(error);
                if !sleep_unless_cancelled(cancel, delay).await {
                    tracing::info!(attempt, "upstream call cancelled during backoff");
                    return Err(ClassifiedFailure::Cancelled {
                        last_error,
                        attempts: attempt,
                        total_wait,
                    });
                }
                total_wait += delay;
                waited = delay;
                attempt += 1;
            }
        }
    }
}

/// Sleep for `delay`; returns false if `cancel` fired first.
async fn sleep_unless_cancelled(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Log line for a failure that will be retried.
fn retry_note(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Timeout => "upstream request timed out, retrying",
        ErrorKind::Connection => "upstream connection failed, retrying",
        _ => user_message(kind.status()),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::UpstreamError;
    use std::cell::Cell;
    use std::future::{pending, ready, Ready};
    use std::io;
    use tokio::time::Instant;

    type Outcome = Result<&'static str, UpstreamError>;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Ok,
        Status(u16),
        Reset,
    }

    fn step_result(step: Step) -> Outcome {
        match step {
            Step::Ok => Ok("done"),
            Step::Status(code) => Err(UpstreamError::http(code, "scripted")),
            Step::Reset => Err(io::Error::from(io::ErrorKind::ConnectionReset).into()),
        }
    }

    /// Plays `steps` in order, repeating the last one, counting invocations.
    fn scripted<'a>(steps: &'a [Step], calls: &'a Cell<u32>) -> impl FnMut() -> Ready<Outcome> + 'a {
        move || {
            let n = calls.get() as usize;
            calls.set(calls.get() + 1);
            ready(step_result(steps[n.min(steps.len() - 1)]))
        }
    }

    fn policy(max_attempts: u32, min_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(min_ms),
            Duration::from_millis(max_ms),
        )
        .unwrap()
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_rate_limits() {
        let calls = Cell::new(0);
        let mut delays = Vec::new();
        let start = Instant::now();
        let result = run_with_retry_observed(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            |r| delays.extend(r.next_delay),
            scripted(&[Step::Status(429), Step::Status(429), Step::Ok], &calls),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
        assert_eq!(delays, vec![secs(1), secs(2)]);
        assert!(start.elapsed() >= secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_fails_immediately() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let err = run_with_retry(
            &RetryPolicy::default(),
            scripted(&[Step::Status(404)], &calls),
        )
        .await
        .unwrap_err();

        assert!(err.is_terminal());
        assert_eq!(err.message(), "Resource not found. It may have been deleted.");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_exhaust_attempts() {
        let calls = Cell::new(0);
        let mut delays = Vec::new();
        let err = run_with_retry_observed(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            |r| delays.extend(r.next_delay),
            scripted(&[Step::Status(500)], &calls),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.get(), 3);
        assert_eq!(delays, vec![secs(1), secs(2)]);
        match err {
            ClassifiedFailure::Exhausted {
                last_error,
                kind,
                attempts,
                total_wait,
                message,
            } => {
                assert!(matches!(last_error, UpstreamError::Status { status: 500, .. }));
                assert_eq!(kind, ErrorKind::ServerError(500));
                assert_eq!(attempts, 3);
                assert_eq!(total_wait, secs(3));
                assert!(message.contains("gave up after 3 attempts"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connection_reset_is_retried() {
        let calls = Cell::new(0);
        let mut records = Vec::new();
        let result = run_with_retry_observed(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            |r| records.push((r.class(), r.next_delay)),
            scripted(&[Step::Reset, Step::Ok], &calls),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.get(), 2);
        assert_eq!(
            records,
            vec![(Some(ErrorClass::Retryable), Some(secs(1))), (None, None)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_uses_exact_attempt_budget() {
        for n in 1..=6 {
            let calls = Cell::new(0);
            let err = run_with_retry(&policy(n, 10, 50), scripted(&[Step::Status(503)], &calls))
                .await
                .unwrap_err();
            assert!(err.is_exhausted());
            assert_eq!(err.attempts(), n);
            assert_eq!(calls.get(), n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_attempt_k_stops_there() {
        for k in 1..=5usize {
            let mut steps = vec![Step::Status(502); k - 1];
            steps.push(Step::Ok);
            let calls = Cell::new(0);
            let result = run_with_retry(&policy(5, 10, 100), scripted(&steps, &calls)).await;
            assert!(result.is_ok());
            assert_eq!(calls.get() as usize, k);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_error_on_last_attempt_stays_terminal() {
        let calls = Cell::new(0);
        let err = run_with_retry(
            &RetryPolicy::default(),
            scripted(&[Step::Status(503), Step::Status(503), Step::Status(401)], &calls),
        )
        .await
        .unwrap_err();

        assert!(err.is_terminal());
        assert_eq!(err.attempts(), 3);
        assert_eq!(
            err.message(),
            "Authentication required. Please re-authenticate."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_collection_is_success() {
        let calls = Cell::new(0);
        let result = run_with_retry(&RetryPolicy::default(), || {
            calls.set(calls.get() + 1);
            ready(Ok::<Vec<u32>, UpstreamError>(Vec::new()))
        })
        .await;

        assert_eq!(result.unwrap(), Vec::<u32>::new());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_retrying() {
        let calls = Cell::new(0);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(secs(5)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = run_with_retry_cancellable(
            &policy(3, 30_000, 60_000),
            &cancel,
            scripted(&[Step::Status(500)], &calls),
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.get(), 1);
        assert!(err.error().is_some());
        assert!(start.elapsed() < secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_skips_operation() {
        let calls = Cell::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_with_retry_cancellable(
            &RetryPolicy::default(),
            &cancel,
            scripted(&[Step::Ok], &calls),
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 0);
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_pending_attempt() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(secs(1)).await;
            trigger.cancel();
        });

        let err = run_with_retry_cancellable(&RetryPolicy::default(), &cancel, || {
            pending::<Outcome>()
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 1);
        assert!(err.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_every_attempt_in_order() {
        let calls = Cell::new(0);
        let mut seen = Vec::new();
        let _ = run_with_retry_observed(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            |r| seen.push((r.attempt, r.waited, r.kind, r.succeeded())),
            scripted(&[Step::Status(429), Step::Status(500), Step::Ok], &calls),
        )
        .await;

        assert_eq!(
            seen,
            vec![
                (1, Duration::ZERO, Some(ErrorKind::Throttled), false),
                (2, secs(1), Some(ErrorKind::ServerError(500)), false),
                (3, secs(2), None, true),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn caller_imposed_timeout_is_retried() {
        let calls = Cell::new(0);
        let mut kinds = Vec::new();
        let result = run_with_retry_observed(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            |r| kinds.push(r.kind),
            || {
                let n = calls.get();
                calls.set(n + 1);
                async move {
                    if n == 0 {
                        tokio::time::timeout(secs(2), pending::<Outcome>())
                            .await
                            .unwrap_or_else(|elapsed| Err(UpstreamError::from(elapsed)))
                    } else {
                        Ok("late")
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "late");
        assert_eq!(calls.get(), 2);
        assert_eq!(kinds, vec![Some(ErrorKind::Timeout), None]);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_policy_across_concurrent_runs() {
        let policy = policy(2, 100, 100);
        let a = async {
            let calls = Cell::new(0);
            let r = run_with_retry(&policy, scripted(&[Step::Status(500), Step::Ok], &calls)).await;
            (r.is_ok(), calls.get())
        };
        let b = async {
            let calls = Cell::new(0);
            let r = run_with_retry(&policy, scripted(&[Step::Status(404)], &calls)).await;
            (r.is_ok(), calls.get())
        };

        let (ra, rb) = tokio::join!(a, b);
        assert_eq!(ra, (true, 2));
        assert_eq!(rb, (false, 1));
    }
}
