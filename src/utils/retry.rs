//! Retry utilities for the joke source
//!
//! A bounded retry loop with a fixed delay between attempts. The delay goes
//! through an injected [`Sleep`] so callers (and tests) decide how time passes.

use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Suspension primitive used between attempts
#[async_trait]
pub trait Sleep: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// [`Sleep`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Fixed delay in milliseconds between attempts
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with a custom attempt limit
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a retry configuration with a custom delay
    pub fn with_delay(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Delay applied before every attempt after the first
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Final failure of a retried operation
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Error from the last attempt
    pub error: E,

    /// Number of attempts made
    pub attempts: u32,
}

/// Execute an operation until it succeeds, the attempt limit is reached, or
/// `should_retry` rejects an error
///
/// The operation receives the 1-based attempt number.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    sleeper: &dyn Sleep,
    mut operation: F,
    should_retry: P,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !should_retry(&error) {
                    warn!(attempt, error = %error, "Non-retryable error encountered");
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }

                if attempt >= max_attempts {
                    warn!(attempt, max_attempts, error = %error, "Retries exhausted");
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }

                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = config.delay_ms,
                    error = %error,
                    "Operation failed, will retry"
                );
                sleeper.sleep(config.delay()).await;
                attempt += 1;
            }
        }
    }
}
