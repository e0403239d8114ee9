//! Bounded retry with a fixed delay between attempts.
//!
//! Every remote stage of the pipeline (rewrite, speech, image) goes through
//! [`retry`] with the same [`RetryPolicy`]: a fixed number of total attempts
//! and a constant pause, no jitter and no growth.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

use crate::error::Stage;

/// Retry budget shared by all remote stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no waiting.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Same budget without the pause between attempts.
    #[must_use]
    pub fn without_delay(self) -> Self {
        Self {
            delay: Duration::ZERO,
            ..self
        }
    }
}

/// Why [`retry`] gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with an error the predicate refused to retry.
    #[error("{0}")]
    Fatal(E),
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is spent.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut, P>(
    policy: RetryPolicy,
    stage: Stage,
    is_retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
            Err(e) if attempt >= max_attempts => {
                error!(%stage, attempt, "{stage} failed after {attempt} attempts: {e}");
                return Err(RetryError::Exhausted { attempts: attempt, last: e });
            }
            Err(e) => {
                warn!(
                    %stage,
                    attempt,
                    max_attempts,
                    "{stage} attempt failed ({e}), trying again in {:.1}s",
                    policy.delay.as_secs_f64()
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    enum Failure {
        Busy,
        Broken,
    }

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::default().without_delay()
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let calls = Cell::new(0);
        let result: Result<u32, RetryError<Failure>> =
            retry(fast(), Stage::Audio, |_| true, |attempt| {
                calls.set(calls.get() + 1);
                async move { Ok(attempt) }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let result: Result<u32, RetryError<Failure>> =
            retry(fast(), Stage::Rewrite, |e| *e == Failure::Busy, |attempt| async move {
                if attempt < 3 {
                    Err(Failure::Busy)
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn stops_after_four_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), RetryError<Failure>> =
            retry(fast(), Stage::Audio, |_| true, |_| {
                calls.set(calls.get() + 1);
                async { Err(Failure::Busy) }
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last, Failure::Busy);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_aborts_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), RetryError<Failure>> =
            retry(fast(), Stage::Audio, |e| *e == Failure::Busy, |_| {
                calls.set(calls.get() + 1);
                async { Err(Failure::Broken) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(Failure::Broken))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let calls = Cell::new(0);
        let _: Result<(), RetryError<Failure>> = retry(policy, Stage::Image, |_| true, |_| {
            calls.set(calls.get() + 1);
            async { Err(Failure::Busy) }
        })
        .await;

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn default_policy_matches_pipeline_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }
}
