//! Stage retry and fallback policy.
//!
//! Every external call in the pipeline runs under a [`StagePolicy`]: a bounded
//! number of attempts with exponential backoff, a predicate deciding which
//! errors are worth repeating, and optionally a fallback producer used once
//! the attempts are exhausted.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry behaviour for one pipeline stage.
#[derive(Debug, Clone)]
pub struct StagePolicy {
    /// Stage name for logging and metrics.
    pub stage: &'static str,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl StagePolicy {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// One attempt, no backoff. Used for the encoder, whose failures are fatal.
    pub fn single_attempt(stage: &'static str) -> Self {
        Self::new(stage).with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `retry` (1-based).
    fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up.
    pub async fn run<F, Fut, T, E, R>(&self, operation: F, is_retryable: R) -> RetryResult<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => return RetryResult::Success(value),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    let delay = self.delay_for_retry(attempt);
                    debug!(
                        stage = self.stage,
                        "attempt {} failed, retrying in {:?}: {}", attempt, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        stage = self.stage,
                        "giving up after {} attempt(s): {}", attempt, e
                    );
                    return RetryResult::Failed {
                        error: e,
                        attempts: attempt,
                    };
                }
            }
        }
    }

    /// Like [`run`](Self::run), but hands the final error to `fallback` and
    /// returns whatever it produces.
    pub async fn run_or_fallback<F, Fut, T, E, R, FB, FbFut>(
        &self,
        operation: F,
        is_retryable: R,
        fallback: FB,
    ) -> T
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
        FB: FnOnce(E) -> FbFut,
        FbFut: Future<Output = T>,
    {
        match self.run(operation, is_retryable).await {
            RetryResult::Success(value) => value,
            RetryResult::Failed { error, .. } => fallback(error).await,
        }
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all attempts were exhausted.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Suppresses log spam from a loop that keeps failing the same way.
#[derive(Debug, Default)]
pub struct FailureTracker {
    consecutive_failures: u32,
    max_logged_failures: u32,
    suppressed: bool,
}

impl FailureTracker {
    pub fn new(max_logged_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_logged_failures,
            suppressed: false,
        }
    }

    /// Record a successful operation (resets failure count).
    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 && self.suppressed {
            debug!(
                "Recovered after {} consecutive failures",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
        self.suppressed = false;
    }

    /// Record a failed operation. Returns whether this failure should be logged.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;

        if self.consecutive_failures <= self.max_logged_failures {
            true
        } else if self.consecutive_failures == self.max_logged_failures + 1 {
            self.suppressed = true;
            warn!(
                "Suppressing further failure logs after {} consecutive failures",
                self.max_logged_failures
            );
            false
        } else {
            false
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures
    }
}
