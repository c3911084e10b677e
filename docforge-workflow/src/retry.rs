//! Retry middleware with exponential backoff.
//!
//! The execution engine composes a [`RetryPolicy`] around the processor
//! invocation and, separately, around the persistence call. Whether an error
//! is worth retrying is decided by the caller through a classifier closure,
//! so permanent failures give up after the first attempt.
//!
//! # Example
//!
//! ```no_run
//! use docforge_workflow::retry::{retry_with, ExponentialBackoff, RetryConfig};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = ExponentialBackoff::new(RetryConfig {
//!     max_retries: 2,
//!     initial_delay: Duration::from_millis(100),
//!     ..Default::default()
//! });
//!
//! let outcome = retry_with(&policy, |_: &&str| true, || async { Ok::<_, &str>(42) }).await;
//! assert_eq!(outcome.attempts, 1);
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Jitter applied to each computed delay
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: JitterStrategy::None,
        }
    }
}

/// Jitter strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterStrategy {
    #[default]
    None,
    /// Random value between 0 and the computed delay
    Full,
    /// Half the delay plus a random half
    Equal,
}

impl JitterStrategy {
    fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                let jitter = rand::random::<f64>();
                Duration::from_secs_f64(delay.as_secs_f64() * jitter)
            }
            JitterStrategy::Equal => {
                let jitter = rand::random::<f64>();
                let base = delay.as_secs_f64() / 2.0;
                Duration::from_secs_f64(base + (base * jitter))
            }
        }
    }
}

pub trait RetryPolicy: Send + Sync {
    /// Delay before retry number `retry` (0-based), or `None` once the
    /// retry budget is exhausted.
    fn next_delay(&self, retry: u32) -> Option<Duration>;

    fn max_retries(&self) -> u32;
}

/// Exponential backoff retry policy
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: RetryConfig,
}

impl ExponentialBackoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, retry: u32) -> Option<Duration> {
        if retry >= self.config.max_retries {
            return None;
        }

        let base_delay =
            self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(retry as i32);
        let delay = Duration::from_secs_f64(base_delay.min(self.config.max_delay.as_secs_f64()));

        Some(self.config.jitter.apply(delay))
    }

    fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

/// Result of a retried operation along with the number of attempts made.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `operation` until it succeeds, returns an error `should_retry`
/// rejects, or the policy's retry budget is spent.
pub async fn retry_with<P, R, F, Fut, T, E>(
    policy: &P,
    should_retry: R,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    P: RetryPolicy + ?Sized,
    R: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut retry = 0u32;

    loop {
        let attempts = retry + 1;
        debug!("Attempt {}/{}", attempts, policy.max_retries() + 1);

        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!("Operation succeeded after {} retries", retry);
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(err) => {
                if !should_retry(&err) {
                    warn!("Error is not retryable, giving up: {}", err);
                    return RetryOutcome {
                        result: Err(err),
                        attempts,
                    };
                }

                match policy.next_delay(retry) {
                    Some(delay) => {
                        debug!("Retrying after {:?}: {}", delay, err);
                        sleep(delay).await;
                        retry += 1;
                    }
                    None => {
                        warn!("Max retry attempts reached: {}", err);
                        return RetryOutcome {
                            result: Err(err),
                            attempts,
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy(max_retries: u32) -> ExponentialBackoff {
        ExponentialBackoff::new(RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(10),
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let outcome = retry_with(&policy(3), |_: &&str| true, || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::Relaxed);
                Ok::<_, &str>(42)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let outcome = retry_with(&policy(2), |_: &&str| true, || {
            let c = counter_clone.clone();
            async move {
                let count = c.fetch_add(1, Ordering::Relaxed);
                if count < 2 {
                    Err("temporary error")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fails_after_budget() {
        let outcome = retry_with(&policy(3), |_: &&str| true, || async {
            Err::<(), _>("still failing")
        })
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_fast() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let outcome = retry_with(&policy(5), |e: &&str| *e != "permanent", || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::Relaxed);
                Err::<(), _>("permanent")
            }
        })
        .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let policy = ExponentialBackoff::new(RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: JitterStrategy::None,
        });

        assert_eq!(policy.next_delay(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.next_delay(5), None);
    }

    #[test]
    fn test_exponential_backoff_max_delay() {
        let policy = ExponentialBackoff::new(RetryConfig {
            max_retries: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: JitterStrategy::None,
        });

        assert_eq!(policy.next_delay(5), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_full_jitter_stays_below_base_delay() {
        let policy = ExponentialBackoff::new(RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: JitterStrategy::Full,
        });

        for _ in 0..20 {
            assert!(policy.next_delay(1).unwrap() <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_no_retries_policy() {
        assert_eq!(ExponentialBackoff::no_retries().next_delay(0), None);
    }
}
