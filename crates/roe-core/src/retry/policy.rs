use rand::Rng;
use std::time::Duration;

use super::classify::{ErrorClass, ErrorKind};

/// Decision returned by the retry policy for a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay.
    RetryAfter(Duration),
    /// The error is retryable but the attempt budget is spent.
    Exhausted,
    /// The error is terminal; retrying would not help.
    Terminal,
}

/// Rejected policy parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("min_delay ({min:?}) must not exceed max_delay ({max:?})")]
    DelayBounds { min: Duration, max: Duration },
    #[error("jitter must be a fraction in [0, 1], got {0}")]
    Jitter(f64),
    #[error("invalid delay of {0} seconds")]
    Seconds(f64),
}

/// Exponential backoff policy with a floor and a ceiling.
///
/// A policy is plain data: it is validated once in [`RetryPolicy::new`] and
/// never mutated afterwards, so one value can be shared by any number of
/// concurrent executions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` counts the first attempt.
    pub fn new(
        max_attempts: u32,
        min_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if min_delay > max_delay {
            return Err(PolicyError::DelayBounds {
                min: min_delay,
                max: max_delay,
            });
        }
        Ok(Self {
            max_attempts,
            min_delay,
            max_delay,
            jitter: 0.0,
        })
    }

    /// Same policy with bounded jitter: each sleep is drawn from
    /// `[max(min_delay, d * (1 - jitter)), d]`.
    pub fn with_jitter(self, jitter: f64) -> Result<Self, PolicyError> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(PolicyError::Jitter(jitter));
        }
        Ok(Self { jitter, ..self })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Deterministic delay after the given failed attempt (1-based):
    /// `min_delay * 2^(attempt-1)`, clamped to `[min_delay, max_delay]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let raw = self
            .min_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay);
        raw.clamp(self.min_delay, self.max_delay)
    }

    /// Delay actually slept after the given failed attempt, jitter applied.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.jitter == 0.0 {
            return delay;
        }
        let floor = delay.mul_f64(1.0 - self.jitter).max(self.min_delay);
        if floor >= delay {
            return delay;
        }
        rand::thread_rng().gen_range(floor..=delay)
    }

    /// Decide what to do after `attempt` (1-based) failed with an error of `kind`.
    ///
    /// Terminal errors are reported as such even on the last attempt.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        match kind.class() {
            ErrorClass::Terminal => RetryDecision::Terminal,
            ErrorClass::Retryable if attempt >= self.max_attempts => RetryDecision::Exhausted,
            ErrorClass::Retryable => RetryDecision::RetryAfter(self.backoff_for_attempt(attempt)),
        }
    }
}
