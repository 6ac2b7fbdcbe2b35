//! Job submission and worker spawning.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::types::{BlockNumber, BlockRange, JobId};

use super::BlockFetcher;
use super::fetch_task::{FetchTaskContext, run_fetch_task};

impl BlockFetcher {
    /// Submit a range job and start fetching it in the background.
    ///
    /// Returns [`Error::InvalidRange`] when `start > end` and
    /// [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun.
    pub async fn submit(&self, start: BlockNumber, end: BlockNumber) -> Result<JobId> {
        let range = BlockRange::new(start, end)?;
        self.submit_range(range).await
    }

    /// Submit an already validated range
    pub async fn submit_range(&self, range: BlockRange) -> Result<JobId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let (id, cancel_token) = self.registry.insert(range).await;

        // Lost a race with shutdown: the job is registered but must not run
        if !self.accepting_new.load(Ordering::SeqCst) {
            cancel_token.cancel();
        }

        let ctx = FetchTaskContext {
            id,
            range,
            output_path: self.output_path(id, range),
            batch_size: self.config.fetch.batch_size,
            source: self.source.clone(),
            registry: self.registry.clone(),
            cancel_token,
        };

        tracing::info!(job_id = %id, %range, "Job submitted");
        tokio::spawn(run_fetch_task(ctx));

        Ok(id)
    }

    /// `<output_dir>/eth_blocks_<start>_<end>_<job id>.csv`
    pub(crate) fn output_path(&self, id: JobId, range: BlockRange) -> PathBuf {
        self.config.fetch.output_dir.join(format!(
            "eth_blocks_{}_{}_{}.csv",
            range.start, range.end, id
        ))
    }
}
