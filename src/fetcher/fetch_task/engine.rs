//! The batch engine: fetch a range in ordered batches, writing only a gapless prefix.

use tokio_util::sync::CancellationToken;

use crate::output::OutputWriter;
use crate::source::RateLimitedSource;
use crate::types::{BlockNumber, BlockRange, BlockRecord};

use super::batching::fetch_batch;
use super::context::ProgressSink;

/// How a range fetch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Every block in the range was written
    Completed,
    /// Cancellation was observed; the written prefix is kept
    Cancelled,
    /// A block could not be fetched or the output could not be written
    Failed(String),
}

/// Outcome plus the final cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// How the fetch ended
    pub outcome: FetchOutcome,
    /// Next block that would have been written; `end + 1` when completed
    pub cursor: BlockNumber,
}

/// Fetch `range` batch by batch and append it to `writer` in ascending order.
///
/// For each batch every block is fetched concurrently, the results are
/// sorted, and records are appended while they match the cursor. The first
/// missing block ends the walk even if later blocks in the batch succeeded,
/// so the output always holds exactly `range.start..cursor`. The writer is
/// flushed and `progress` notified after every batch, before the next batch
/// starts; the cursor only advances once the flush succeeds.
pub async fn run_range(
    source: &RateLimitedSource,
    cancel: &CancellationToken,
    range: BlockRange,
    batch_size: u64,
    writer: &mut OutputWriter,
    progress: &dyn ProgressSink,
) -> FetchReport {
    let mut cursor = range.start;

    for batch in range.batches(batch_size) {
        if cancel.is_cancelled() {
            return FetchReport {
                outcome: FetchOutcome::Cancelled,
                cursor,
            };
        }

        let batch_end = *batch.end();
        tracing::debug!(start = *batch.start(), end = batch_end, "Fetching batch");

        let results = fetch_batch(source, cancel, batch).await;

        let prefix = contiguous_prefix(cursor, &results.records);
        for record in prefix {
            writer.append(record);
        }
        if let Err(e) = writer.flush().await {
            return failed(cursor, format!("failed to write output: {}", e));
        }
        cursor += prefix.len() as u64;
        progress.on_batch_complete(cursor).await;

        if cursor <= batch_end {
            let outcome = if cancel.is_cancelled() {
                tracing::info!(cursor, abandoned = results.cancelled, "Batch interrupted by cancellation");
                FetchOutcome::Cancelled
            } else if let Some((block, error)) = results.first_error {
                tracing::warn!(block, error = %error, cursor, "Batch stopped at failed block");
                FetchOutcome::Failed(error.to_string())
            } else {
                FetchOutcome::Failed(format!("gap at block {}", cursor))
            };
            return FetchReport { outcome, cursor };
        }
    }

    FetchReport {
        outcome: FetchOutcome::Completed,
        cursor,
    }
}

/// Leading records that continue `cursor` without a gap
fn contiguous_prefix(cursor: BlockNumber, records: &[BlockRecord]) -> &[BlockRecord] {
    let len = records
        .iter()
        .zip(cursor..)
        .take_while(|(record, expected)| record.number == *expected)
        .count();
    &records[..len]
}

fn failed(cursor: BlockNumber, message: String) -> FetchReport {
    tracing::error!(cursor, error = %message, "Output write failed");
    FetchReport {
        outcome: FetchOutcome::Failed(message),
        cursor,
    }
}
