//! In-memory job registry
//!
//! Owns every submitted job's visible state. Each mutation takes the write
//! guard once and changes all affected fields inside it, so a concurrent
//! [`JobRegistry::status`] never sees a half-applied update such as `done`
//! with a stale cursor.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::{BlockNumber, BlockRange, CancelOutcome, JobId, JobSnapshot, JobState};

/// Registry-owned state of one job
#[derive(Debug)]
struct JobRecord {
    range: BlockRange,
    state: JobState,
    cursor: BlockNumber,
    file_path: Option<PathBuf>,
    error: Option<String>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    /// Submission order, breaks `created_at` ties
    seq: u64,
}

impl JobRecord {
    fn snapshot(&self, id: JobId) -> JobSnapshot {
        JobSnapshot {
            id,
            state: self.state,
            start: self.range.start,
            end: self.range.end,
            cursor: self.cursor,
            last_written: (self.cursor > self.range.start).then(|| self.cursor - 1),
            file_path: self.file_path.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Tracks the lifecycle of every submitted job
///
/// Cloning is cheap; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
    next_seq: Arc<AtomicU64>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `pending` job and hand back its cancellation token
    pub async fn insert(&self, range: BlockRange) -> (JobId, CancellationToken) {
        let id = JobId::new();
        let cancel = CancellationToken::new();
        let record = JobRecord {
            range,
            state: JobState::Pending,
            cursor: range.start,
            file_path: None,
            error: None,
            cancel: cancel.clone(),
            created_at: Utc::now(),
            finished_at: None,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        self.jobs.write().await.insert(id, record);
        tracing::debug!(job_id = %id, %range, "Job registered");

        (id, cancel)
    }

    /// Current view of a job
    pub async fn status(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.read().await.get(&id).map(|job| job.snapshot(id))
    }

    /// Signal a job to stop.
    ///
    /// The state becomes `stopped` once the worker observes the signal; a
    /// job that already finished is left untouched.
    pub async fn cancel(&self, id: JobId) -> Result<CancelOutcome> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

        if job.state.is_terminal() {
            return Ok(CancelOutcome::AlreadyFinished);
        }

        job.cancel.cancel();
        tracing::info!(job_id = %id, "Job cancellation requested");
        Ok(CancelOutcome::Stopping)
    }

    /// Signal every unfinished job to stop; returns how many were signalled
    pub async fn cancel_all(&self) -> usize {
        let jobs = self.jobs.read().await;
        let mut signalled = 0;
        for job in jobs.values().filter(|job| !job.state.is_terminal()) {
            job.cancel.cancel();
            signalled += 1;
        }
        signalled
    }

    /// Job ids in submission order
    pub async fn list(&self) -> Vec<JobId> {
        self.snapshots().await.into_iter().map(|s| s.id).collect()
    }

    /// Snapshots of every job in submission order
    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let mut entries: Vec<_> = jobs.iter().collect();
        entries.sort_by_key(|(_, job)| (job.created_at, job.seq));
        entries
            .into_iter()
            .map(|(id, job)| job.snapshot(*id))
            .collect()
    }

    /// Number of jobs not yet in a terminal state
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| !job.state.is_terminal())
            .count()
    }

    /// `pending` → `running`
    pub async fn mark_running(&self, id: JobId) {
        if let Some(job) = self.jobs.write().await.get_mut(&id)
            && job.state == JobState::Pending
        {
            job.state = JobState::Running;
        }
    }

    /// Record where the job's artifact lives
    pub async fn set_file_path(&self, id: JobId, path: PathBuf) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.file_path = Some(path);
        }
    }

    /// Advance the progress cursor after a flushed batch
    pub async fn update_cursor(&self, id: JobId, cursor: BlockNumber) {
        if let Some(job) = self.jobs.write().await.get_mut(&id)
            && !job.state.is_terminal()
        {
            job.cursor = cursor;
        }
    }

    /// Move a job to a terminal state together with its final cursor.
    ///
    /// Terminal states are sticky: finishing an already finished job is ignored.
    pub async fn finish(
        &self,
        id: JobId,
        state: JobState,
        cursor: BlockNumber,
        error: Option<String>,
    ) {
        debug_assert!(state.is_terminal());

        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        if job.state.is_terminal() {
            tracing::debug!(job_id = %id, state = %job.state, "Ignoring finish of terminal job");
            return;
        }

        job.state = state;
        job.cursor = cursor;
        job.error = error;
        job.finished_at = Some(Utc::now());
    }
}
