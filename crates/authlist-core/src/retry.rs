//! Bounded retry with exponential backoff.
//!
//! Used for handing requests to the approval service: a submission is tried
//! once, then retried up to `max_retries` more times with growing delays.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff schedule for a retried operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = try once).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl RetryConfig {
    /// Doubling backoff between `initial_delay` and `max_delay`.
    #[must_use]
    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// A single attempt and no retries.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 2.0,
        }
    }

    /// Total attempts this schedule allows.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before `attempt` (0-indexed). Attempt 0 never waits.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = raw_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms.max(0.0) as u64)
    }

    /// Whether another attempt may follow `attempt` (0-indexed).
    #[must_use]
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(500), Duration::from_secs(10))
    }
}

/// How a retried operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Success(T),
    /// Every allowed attempt failed, or a failure was not retryable.
    Exhausted {
        /// Error from the last attempt.
        error: E,
        /// Attempts made.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether an attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Run `operation` until it succeeds, `should_retry` refuses an error, or the
/// schedule is used up. The closure receives the 0-indexed attempt number.
///
/// ```
/// use std::time::Duration;
/// use authlist_core::retry::{RetryConfig, RetryOutcome, retry};
///
/// # tokio_test_block(async {
/// let config = RetryConfig::exponential(2, Duration::ZERO, Duration::ZERO);
/// let outcome = retry(&config, |attempt| async move {
///     if attempt == 0 { Err("flaky") } else { Ok(attempt) }
/// }, |_| true).await;
/// assert_eq!(outcome, RetryOutcome::Success(1));
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn retry<T, E, Fut, F, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(error) => {
                if !config.allows_retry_after(attempt) || !should_retry(&error) {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: attempt.saturating_add(1),
                    };
                }
                attempt = attempt.saturating_add(1);
                tokio::time::sleep(config.delay_before(attempt)).await;
            },
        }
    }
}
