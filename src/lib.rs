//! # eth-fetcher
//!
//! Job-based batch retrieval of Ethereum block gas and tip totals.
//!
//! A job names a closed block range. The fetcher pulls each block through a
//! shared, rate-limited and cached source, computes its gas used and total
//! priority-fee tips, and appends one CSV row per block to the job's artifact.
//! Rows always form a contiguous prefix of the range in ascending order, so an
//! artifact that was stopped or failed half way is still usable.
//!
//! ## Design
//!
//! - **Gapless output** - a block is written only once every lower block is
//! - **Shared admission** - one token bucket and one block cache across all jobs
//! - **Never give up on transient failures** - unbounded backoff until cancelled
//! - **Library-first** - the REST adapter in [`api`] is a thin layer over [`BlockFetcher`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use eth_fetcher::{BlockFetcher, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().with_alchemy_key_from_env();
//!     let fetcher = BlockFetcher::new(config).await?;
//!
//!     let id = fetcher.submit(19_000_000, 19_000_099).await?;
//!     let snapshot = fetcher.wait(id).await?;
//!     println!("{} -> {:?}", snapshot.state, snapshot.file_path);
//!
//!     fetcher.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Block cache persistence layer
pub mod db;
/// Error types
pub mod error;
/// Job orchestration (decomposed into focused submodules)
pub mod fetcher;
/// Incremental CSV artifact writer
pub mod output;
/// Shared token-bucket admission control
pub mod rate_limiter;
/// In-memory job registry
pub mod registry;
/// Retry logic with exponential backoff
pub mod retry;
/// Remote block sources and the cached, rate-limited wrapper
pub mod source;
/// Core types
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test_helpers;

// Re-export commonly used types
pub use config::{ApiConfig, Config, FetchConfig, RateLimitConfig, RetryConfig, SourceConfig};
pub use db::{Database, RecordCache};
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::BlockFetcher;
pub use fetcher::fetch_task::{FetchOutcome, FetchReport, ProgressSink, run_range};
pub use output::OutputWriter;
pub use rate_limiter::RateLimiter;
pub use registry::JobRegistry;
pub use source::{JsonRpcSource, RateLimitedSource, RecordSource};
pub use types::{
    BlockNumber, BlockRange, BlockRecord, CancelOutcome, JobId, JobSnapshot, JobState, RawBlock,
    RawTransaction,
};

/// Helper function to run the fetcher with graceful signal handling.
///
/// Waits for a termination signal and then calls the fetcher's `shutdown()` method,
/// which stops every running job at its next cancellation check.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use eth_fetcher::{BlockFetcher, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = BlockFetcher::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(fetcher).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(fetcher: BlockFetcher) -> Result<()> {
    wait_for_signal().await;
    fetcher.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
