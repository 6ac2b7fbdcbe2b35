//! Job finalization: map the engine outcome to a terminal state.

use crate::types::JobState;

use super::context::FetchTaskContext;
use super::engine::{FetchOutcome, FetchReport};

/// Record the terminal state, final cursor and error message in one registry update.
pub(super) async fn finalize_job(ctx: &FetchTaskContext, report: FetchReport) {
    let id = ctx.id;
    let FetchReport { outcome, cursor } = report;
    let written = cursor - ctx.range.start;

    let (state, error) = match outcome {
        FetchOutcome::Completed => {
            tracing::info!(job_id = %id, blocks = written, "Job complete");
            (JobState::Done, None)
        }
        FetchOutcome::Cancelled => {
            tracing::info!(job_id = %id, blocks = written, cursor, "Job stopped");
            (JobState::Stopped, None)
        }
        FetchOutcome::Failed(message) => {
            tracing::error!(job_id = %id, blocks = written, cursor, error = %message, "Job failed");
            (JobState::Error, Some(message))
        }
    };

    ctx.registry.finish(id, state, cursor, error).await;
}
