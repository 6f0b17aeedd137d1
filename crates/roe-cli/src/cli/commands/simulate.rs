//! `roe simulate` – drive the executor against a scripted upstream.

use anyhow::Result;
use roe_core::retry::{
    run_with_retry_observed, AttemptRecord, ClassifiedFailure, RetryPolicy, UpstreamError,
};
use std::cell::Cell;
use std::io;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What the fake upstream does on one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    /// Succeeds with one item.
    Ok,
    /// Succeeds with no items.
    Empty,
    /// Fails with this status code.
    Status(u16),
    /// Never answers; only the attempt timeout ends it.
    Timeout,
    /// Connection reset by peer.
    Reset,
    /// Connection refused.
    Refused,
}

impl FromStr for Scripted {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ok" => Ok(Scripted::Ok),
            "empty" => Ok(Scripted::Empty),
            "timeout" => Ok(Scripted::Timeout),
            "reset" => Ok(Scripted::Reset),
            "refused" => Ok(Scripted::Refused),
            other => match other.parse::<u16>() {
                Ok(code) if (100..=599).contains(&code) => Ok(Scripted::Status(code)),
                _ => Err(format!(
                    "unknown outcome {s:?} (expected a status code, ok, empty, timeout, reset or refused)"
                )),
            },
        }
    }
}

async fn play(step: Scripted) -> Result<Vec<&'static str>, UpstreamError> {
    match step {
        Scripted::Ok => Ok(vec!["item"]),
        Scripted::Empty => Ok(Vec::new()),
        Scripted::Status(code) => Err(UpstreamError::http(code, "scripted response")),
        Scripted::Timeout => std::future::pending().await,
        Scripted::Reset => Err(io::Error::from(io::ErrorKind::ConnectionReset).into()),
        Scripted::Refused => Err(io::Error::from(io::ErrorKind::ConnectionRefused).into()),
    }
}

/// Run the script under `policy`, each attempt bounded by `attempt_timeout`.
/// Once the script is used up, its last outcome repeats.
pub async fn simulate<O>(
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    outcomes: &[Scripted],
    cancel: &CancellationToken,
    observe: O,
) -> Result<Vec<&'static str>, ClassifiedFailure<UpstreamError>>
where
    O: FnMut(&AttemptRecord<'_, UpstreamError>),
{
    let next = Cell::new(0usize);
    run_with_retry_observed(policy, cancel, observe, || {
        let i = next.get();
        next.set(i + 1);
        let step = outcomes
            .get(i)
            .or_else(|| outcomes.last())
            .copied()
            .unwrap_or(Scripted::Ok);
        async move {
            tokio::time::timeout(attempt_timeout, play(step))
                .await
                .unwrap_or_else(|elapsed| Err(elapsed.into()))
        }
    })
    .await
}

fn print_attempt(r: &AttemptRecord<'_, UpstreamError>) {
    match (r.error, r.next_delay) {
        (None, _) => println!("attempt {}: ok", r.attempt),
        (Some(e), Some(d)) => println!(
            "attempt {}: {} ({:?}), retrying in {:.3}s",
            r.attempt,
            e,
            r.class(),
            d.as_secs_f64()
        ),
        (Some(e), None) => println!("attempt {}: {} ({:?})", r.attempt, e, r.class()),
    }
}

pub async fn run_simulate(
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    outcomes: &[Scripted],
) -> Result<()> {
    anyhow::ensure!(!outcomes.is_empty(), "at least one outcome is required");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = simulate(policy, attempt_timeout, outcomes, &cancel, print_attempt).await;
    watcher.abort();

    let items = result?;
    if items.is_empty() {
        println!("succeeded: no items");
    } else {
        println!("succeeded with {} item(s)", items.len());
    }
    Ok(())
}
