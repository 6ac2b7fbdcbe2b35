//! Shared state for a single fetch task and progress reporting.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::registry::JobRegistry;
use crate::source::RateLimitedSource;
use crate::types::{BlockNumber, BlockRange, JobId};

/// Receives the cursor after every flushed batch
///
/// The engine holds only this callback, never the job record itself.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// `cursor` is the next block expected in the output; everything below it is durable
    async fn on_batch_complete(&self, cursor: BlockNumber);
}

/// Shared context for a single fetch task, reducing parameter passing between helpers.
pub(crate) struct FetchTaskContext {
    pub(crate) id: JobId,
    pub(crate) range: BlockRange,
    pub(crate) output_path: PathBuf,
    pub(crate) batch_size: u64,
    pub(crate) source: RateLimitedSource,
    pub(crate) registry: JobRegistry,
    pub(crate) cancel_token: CancellationToken,
}

#[async_trait]
impl ProgressSink for FetchTaskContext {
    async fn on_batch_complete(&self, cursor: BlockNumber) {
        tracing::debug!(job_id = %self.id, cursor, "Batch flushed");
        self.registry.update_cursor(self.id, cursor).await;
    }
}
