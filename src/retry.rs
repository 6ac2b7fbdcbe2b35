//! Retry logic with exponential backoff
//!
//! Transient remote failures are retried without an attempt limit; only
//! success, a fatal error, or cancellation ends the loop. Each attempt reports
//! an explicit [`Attempt`] and each wait is a cancellable [`Backoff::sleep`],
//! so the loop can be driven under paused Tokio time in tests.
//!
//! # Example
//!
//! ```no_run
//! use eth_fetcher::config::RetryConfig;
//! use eth_fetcher::retry::{Attempt, retry_until_cancelled};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> eth_fetcher::Result<()> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let value = retry_until_cancelled(&config, &cancel, || async {
//!     Attempt::Success(42)
//! })
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, rate limiting, RPC hiccups) return `true`.
/// Permanent failures (malformed payloads, bad configuration) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts, refused connections, 429/5xx bodies that fail to decode
            Error::Network(_) => true,
            // RPC error objects (rate limited, header not found yet, ...)
            Error::Rpc(_) => true,
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
            Error::MalformedPayload { .. } => false,
            Error::Cancelled => false,
            Error::Config { .. } => false,
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::Serialization(_) => false,
            Error::InvalidRange { .. } => false,
            Error::NotFound(_) => false,
            Error::ShuttingDown => false,
            Error::ApiServerError(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// The operation produced a value
    Success(T),
    /// Transient failure; back off and try again
    Retry(Error),
    /// Permanent failure; give up on this operation
    Fatal(Error),
    /// Cancellation was observed during the attempt
    Cancelled,
}

impl<T> Attempt<T> {
    /// Classify a plain result, treating any failure after cancellation as cancellation
    pub fn classify(result: Result<T>, cancel: &CancellationToken) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(Error::Cancelled) => Attempt::Cancelled,
            Err(_) if cancel.is_cancelled() => Attempt::Cancelled,
            Err(e) if e.is_retryable() => Attempt::Retry(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

/// Outcome of a backoff wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffWait {
    /// The delay elapsed; retry now
    Elapsed,
    /// Cancellation fired while waiting
    Cancelled,
}

/// Exponential backoff state for one operation
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    retries: u32,
    delay: Duration,
}

impl Backoff {
    /// Start a fresh backoff sequence
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            config: config.clone(),
            retries: 0,
            delay: config.initial_delay,
        }
    }

    /// Number of delays handed out so far
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay for the next retry, then advance the sequence.
    ///
    /// Base delays grow by `backoff_multiplier` and are capped at `max_delay`;
    /// jitter (when enabled) is applied on top of the base.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.delay;
        self.retries += 1;

        // products beyond Duration::MAX (or infinite) saturate at the cap
        let next = Duration::try_from_secs_f64(base.as_secs_f64() * self.config.backoff_multiplier)
            .unwrap_or(self.config.max_delay);
        self.delay = next.min(self.config.max_delay);

        if self.config.jitter {
            add_jitter(base)
        } else {
            base
        }
    }

    /// Sleep for `delay` unless `cancel` fires first
    pub async fn sleep(delay: Duration, cancel: &CancellationToken) -> BackoffWait {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => BackoffWait::Cancelled,
            _ = tokio::time::sleep(delay) => BackoffWait::Elapsed,
        }
    }
}

/// Run `operation` until it succeeds, fails fatally, or `cancel` fires.
///
/// Returns [`Error::Cancelled`] when cancellation is observed, either by the
/// attempt itself or during a backoff wait.
pub async fn retry_until_cancelled<F, Fut, T>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut backoff = Backoff::new(config);

    loop {
        match operation().await {
            Attempt::Success(value) => {
                if backoff.retries() > 0 {
                    tracing::info!(
                        attempts = backoff.retries() + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Attempt::Cancelled => return Err(Error::Cancelled),
            Attempt::Fatal(e) => {
                tracing::error!(error = %e, "Operation failed with non-retryable error");
                return Err(e);
            }
            Attempt::Retry(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    error = %e,
                    attempt = backoff.retries(),
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );
                if Backoff::sleep(delay, cancel).await == BackoffWait::Cancelled {
                    return Err(Error::Cancelled);
                }
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
