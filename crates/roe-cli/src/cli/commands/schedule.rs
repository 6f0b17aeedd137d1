//! `roe schedule` – show the backoff before each retry.

use roe_core::retry::RetryPolicy;

/// One row per attempt: the delay that follows it if it fails with a
/// retryable error. The last attempt has none.
pub fn schedule_rows(policy: &RetryPolicy) -> Vec<(u32, Option<f64>)> {
    (1..=policy.max_attempts())
        .map(|attempt| {
            let delay = (attempt < policy.max_attempts())
                .then(|| policy.delay_for_attempt(attempt).as_secs_f64());
            (attempt, delay)
        })
        .collect()
}

pub fn run_schedule(policy: &RetryPolicy) {
    println!("{:<8} {}", "ATTEMPT", "DELAY AFTER FAILURE");
    for (attempt, delay) in schedule_rows(policy) {
        match delay {
            Some(secs) => println!("{:<8} {:.3}s", attempt, secs),
            None => println!("{:<8} - (final attempt)", attempt),
        }
    }
    if policy.jitter() > 0.0 {
        println!(
            "jitter: each delay may shrink by up to {:.0}% (never below {:.3}s)",
            policy.jitter() * 100.0,
            policy.min_delay().as_secs_f64()
        );
    }
}
