//! Concurrent fetching of one batch.

use std::ops::RangeInclusive;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::source::RateLimitedSource;
use crate::types::{BlockNumber, BlockRecord};

/// What came back from one batch
#[derive(Debug, Default)]
pub(super) struct BatchResults {
    /// Successfully fetched records, ascending by number
    pub(super) records: Vec<BlockRecord>,
    /// Failure of the lowest-numbered block that failed for a reason other than cancellation
    pub(super) first_error: Option<(BlockNumber, Error)>,
    /// Blocks abandoned because of cancellation
    pub(super) cancelled: usize,
}

impl BatchResults {
    fn remember_error(&mut self, number: BlockNumber, error: Error) {
        match &self.first_error {
            Some((existing, _)) if *existing <= number => {}
            _ => self.first_error = Some((number, error)),
        }
    }
}

/// Fetch every block of `batch` concurrently, one task per block.
///
/// Completion order is irrelevant: the results are sorted before returning.
/// Cancelled fetches are dropped silently.
pub(super) async fn fetch_batch(
    source: &RateLimitedSource,
    cancel: &CancellationToken,
    batch: RangeInclusive<BlockNumber>,
) -> BatchResults {
    let mut tasks = JoinSet::new();
    for number in batch {
        let source = source.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { (number, source.get_record(&cancel, number).await) });
    }

    let mut results = BatchResults::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(record))) => results.records.push(record),
            Ok((_, Err(Error::Cancelled))) => results.cancelled += 1,
            Ok((number, Err(e))) => results.remember_error(number, e),
            Err(join_error) => {
                tracing::error!(error = %join_error, "Block fetch task panicked");
                results.remember_error(
                    BlockNumber::MAX,
                    Error::Other(format!("block fetch task failed: {}", join_error)),
                );
            }
        }
    }

    results.records.sort_unstable_by_key(|record| record.number);
    results
}
