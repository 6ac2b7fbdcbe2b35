//! Shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::Result;

use super::BlockFetcher;

/// How long shutdown waits for workers to observe cancellation
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl BlockFetcher {
    /// Gracefully stop the fetcher
    ///
    /// Stops accepting jobs, cancels every unfinished job, waits (bounded)
    /// for the workers to record their terminal state, then closes the
    /// cache database. Artifacts keep whatever prefix was flushed.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.accepting_new.store(false, Ordering::SeqCst);

        // 2. Cancel everything still running
        let signalled = self.registry.cancel_all().await;
        tracing::info!(jobs = signalled, "Signalled cancellation to active jobs");

        // 3. Wait for workers to finish with timeout
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All jobs stopped"),
            Err(_) => tracing::warn!(
                remaining = self.registry.active_count().await,
                "Timeout waiting for jobs to stop, proceeding with shutdown"
            ),
        }

        // 4. Close database connections
        if let Some(db) = &self.db {
            db.pool().close().await;
            tracing::info!("Block cache closed");
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_active_jobs(&self) {
        while self.registry.active_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
