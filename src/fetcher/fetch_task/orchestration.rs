//! Fetch task orchestration: top-level lifecycle for a single job.

use crate::output::OutputWriter;
use crate::types::JobState;

use super::context::FetchTaskContext;
use super::engine::{FetchOutcome, FetchReport, run_range};
use super::finalization::finalize_job;

/// Core fetch task -- orchestrates the full lifecycle of a single job.
///
/// Phases:
/// 1. Bail out if the job was cancelled before the worker started
/// 2. Transition to `running`
/// 3. Open the output artifact and publish its path
/// 4. Run the batch engine over the range
/// 5. Record the terminal state
pub(crate) async fn run_fetch_task(ctx: FetchTaskContext) {
    let id = ctx.id;

    // Phase 1: cancelled while pending
    if ctx.cancel_token.is_cancelled() {
        tracing::info!(job_id = %id, "Job cancelled before it started");
        finalize_job(
            &ctx,
            FetchReport {
                outcome: FetchOutcome::Cancelled,
                cursor: ctx.range.start,
            },
        )
        .await;
        return;
    }

    // Phase 2: running
    ctx.registry.mark_running(id).await;
    tracing::info!(job_id = %id, range = %ctx.range, batch_size = ctx.batch_size, "Job started");

    // Phase 3: output artifact
    let mut writer = match OutputWriter::create(&ctx.output_path).await {
        Ok(writer) => writer,
        Err(e) => {
            let msg = format!("failed to open output {}: {}", ctx.output_path.display(), e);
            tracing::error!(job_id = %id, error = %e, "Failed to open output artifact");
            ctx.registry
                .finish(id, JobState::Error, ctx.range.start, Some(msg))
                .await;
            return;
        }
    };
    ctx.registry
        .set_file_path(id, writer.path().to_path_buf())
        .await;

    // Phase 4: fetch
    let report = run_range(
        &ctx.source,
        &ctx.cancel_token,
        ctx.range,
        ctx.batch_size,
        &mut writer,
        &ctx,
    )
    .await;

    // Phase 5: terminal state
    finalize_job(&ctx, report).await;
}
