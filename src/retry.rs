//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient failures.
//! It implements exponential backoff with jitter, honors server-requested
//! Retry-After waits, and pauses briefly before every first attempt to stay
//! inside the archive's published rate limits.
//!
//! # Example
//!
//! ```no_run
//! use chronam_dl::retry::{IsRetryable, request_with_retry};
//! use chronam_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = request_with_retry(&config, || async {
//!     // Your request here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (rate limiting, server errors, timeouts, connection
/// resets) should return `true`. Permanent failures (client errors, corrupt
/// state, bad configuration) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Server-requested minimum wait before the next attempt, in seconds
    ///
    /// When present, the next backoff delay is raised to at least this value.
    fn retry_after(&self) -> Option<f64> {
        None
    }
}

/// Implementation of IsRetryable for our Error type
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts, connection failures, and transport errors during the
            // request or body read are transient; bad URLs and redirect
            // policy violations are not
            Error::Network(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            // The server asked us to slow down, not to stop
            Error::RateLimited { .. } => true,
            // Server errors are transient; other statuses are the caller's problem
            Error::Http { status, .. } => *status >= 500,
            // I/O errors can be retryable in some cases
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Config errors are permanent
            Error::Config { .. } => false,
            // Exhaustion is the end of retrying, not a reason for more
            Error::RetriesExhausted { .. } => false,
            // Serialization errors are permanent
            Error::Serialization(_) => false,
            // A corrupt state file needs user action, not retries
            Error::CorruptState { .. } => false,
            // The text service answered; it just had nothing for us
            Error::MissingFullText { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<f64> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Execute an async request with exponential backoff retry logic
///
/// Sleeps for `config.base_delay` before the first attempt (courtesy pacing),
/// then retries transient failures up to `config.max_retries` times. Each
/// retry waits the current delay plus up to 10% jitter; afterwards the delay
/// doubles (by `backoff_factor`) up to `max_delay`. A `Retry-After` value
/// reported by the error raises the next delay to at least that many seconds.
///
/// # Arguments
///
/// * `config` - Retry configuration (attempt budget, delays, backoff factor, jitter)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result, or the last error once the retry budget is
/// exhausted. Non-retryable errors are returned immediately.
pub async fn request_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.base_delay;

    // Courtesy pause before the first attempt keeps request bursts inside
    // the archive's rate limits
    tokio::time::sleep(config.base_delay).await;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;

                // A server-specified Retry-After raises the delay floor
                if let Some(secs) = e.retry_after() {
                    if let Ok(floor) = Duration::try_from_secs_f64(secs) {
                        delay = delay.max(floor);
                    }
                }

                let sleep_for = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_retries = config.max_retries,
                    wait_secs = sleep_for.as_secs_f64(),
                    "Request failed, retrying"
                );

                tokio::time::sleep(sleep_for).await;

                // Exponential backoff for the next round
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_factor);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Request failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent synchronized retry bursts
///
/// Jitter is uniformly distributed between 0% and 10% of the delay, so the
/// actual wait falls between `delay` and `1.1 * delay`.
///
/// # Arguments
///
/// * `delay` - Base delay duration
///
/// # Returns
///
/// Jittered delay duration
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor * 0.1);
    Duration::from_secs_f64(jittered_secs)
}
