//! Job control and queries: cancel, status, listing.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{CancelOutcome, JobId, JobSnapshot};

use super::BlockFetcher;

/// Poll interval while waiting for a job to finish
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

impl BlockFetcher {
    /// Current view of a job, `None` for unknown ids
    pub async fn status(&self, id: JobId) -> Option<JobSnapshot> {
        self.registry.status(id).await
    }

    /// Request cancellation of a job
    ///
    /// The worker stops at its next cancellation check; blocks already
    /// written stay in the artifact. Cancelling a finished job is a no-op
    /// reported as [`CancelOutcome::AlreadyFinished`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown job id.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use eth_fetcher::*;
    /// # async fn example(fetcher: BlockFetcher, id: JobId) -> Result<()> {
    /// let outcome = fetcher.cancel(id).await?;
    /// println!("{outcome:?}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: JobId) -> Result<CancelOutcome> {
        self.registry.cancel(id).await
    }

    /// Job ids in submission order
    pub async fn list(&self) -> Vec<JobId> {
        self.registry.list().await
    }

    /// Snapshots of every job in submission order
    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        self.registry.snapshots().await
    }

    /// Wait until a job reaches a terminal state and return its final snapshot
    pub async fn wait(&self, id: JobId) -> Result<JobSnapshot> {
        loop {
            let snapshot = self
                .registry
                .status(id)
                .await
                .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;
            if snapshot.state.is_terminal() {
                return Ok(snapshot);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}
