//! Remote record retrieval behind the cache, the rate limiter and retry
//!
//! [`RecordSource`] is the single "fetch block by number" capability the
//! engine needs. [`RateLimitedSource`] composes it with the process-wide
//! [`RecordCache`] and [`RateLimiter`]:
//!
//! 1. cache hit: returned immediately, no admission token spent
//! 2. cache miss: one token, one remote round trip per attempt
//! 3. transient failure: exponential backoff, retried until success or cancellation
//! 4. malformed payload: returned as [`Error::MalformedPayload`], not retried

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::db::RecordCache;
use crate::error::{Error, Result};
use crate::rate_limiter::RateLimiter;
use crate::retry::{Attempt, retry_until_cancelled};
use crate::types::{BlockNumber, BlockRecord, RawBlock};

mod json_rpc;

pub use json_rpc::JsonRpcSource;

/// Abstraction over the remote block source, enabling testability.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the raw payload of one block.
    ///
    /// Transient problems (timeouts, rate limiting, a block not yet
    /// available) should be reported as [`Error::Network`] or [`Error::Rpc`];
    /// an undecodable payload as [`Error::MalformedPayload`].
    async fn fetch_block(&self, number: BlockNumber) -> Result<RawBlock>;
}

/// Cache-first, rate-limited, retrying access to a [`RecordSource`]
///
/// Cloning is cheap; clones share the cache and the limiter.
#[derive(Clone)]
pub struct RateLimitedSource {
    source: Arc<dyn RecordSource>,
    cache: Arc<dyn RecordCache>,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl RateLimitedSource {
    /// Compose a source with the shared cache and limiter
    pub fn new(
        source: Arc<dyn RecordSource>,
        cache: Arc<dyn RecordCache>,
        limiter: RateLimiter,
        retry: RetryConfig,
    ) -> Self {
        Self {
            source,
            cache,
            limiter,
            retry,
        }
    }

    /// Get one record, from the cache if possible.
    ///
    /// Returns [`Error::Cancelled`] once `cancel` fires, whether the fetch
    /// was waiting for admission, in flight, or backing off.
    pub async fn get_record(
        &self,
        cancel: &CancellationToken,
        number: BlockNumber,
    ) -> Result<BlockRecord> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(record) = self.lookup_cached(number).await {
            tracing::trace!(block = number, "Cache hit");
            return Ok(record);
        }

        retry_until_cancelled(&self.retry, cancel, || self.attempt(cancel, number))
            .await
            .inspect_err(|e| {
                if !matches!(e, Error::Cancelled) {
                    tracing::warn!(block = number, error = %e, "Block fetch failed");
                }
            })
    }

    /// One admission token and one remote round trip
    async fn attempt(&self, cancel: &CancellationToken, number: BlockNumber) -> Attempt<BlockRecord> {
        if let Err(e) = self.limiter.acquire(cancel).await {
            return Attempt::classify(Err(e), cancel);
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Attempt::Cancelled,
            fetched = self.source.fetch_block(number) => fetched,
        };

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => return Attempt::classify(Err(e), cancel),
        };

        match BlockRecord::from_raw(number, &raw) {
            Ok(record) => {
                self.store_cached(&record).await;
                Attempt::Success(record)
            }
            Err(e) => Attempt::Fatal(e),
        }
    }

    async fn lookup_cached(&self, number: BlockNumber) -> Option<BlockRecord> {
        match self.cache.lookup(number).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(block = number, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn store_cached(&self, record: &BlockRecord) {
        if let Err(e) = self.cache.store(record).await {
            tracing::warn!(block = record.number, error = %e, "Failed to cache block");
        }
    }
}
