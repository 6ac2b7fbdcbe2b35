//! Artifact readers and wait helpers

use std::path::Path;
use std::time::Duration;

use eth_fetcher::{BlockFetcher, BlockNumber, JobId, JobSnapshot};

/// Data rows of a CSV artifact, header checked and dropped
pub fn read_rows(path: &Path) -> Vec<String> {
    let contents = std::fs::read_to_string(path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("block_number,timestamp,gas_used,tips"),
        "artifact header"
    );
    lines.map(str::to_string).collect()
}

/// Block numbers of a CSV artifact in file order
pub fn read_block_numbers(path: &Path) -> Vec<BlockNumber> {
    read_rows(path)
        .iter()
        .map(|row| row.split(',').next().unwrap().parse().unwrap())
        .collect()
}

/// Assert the artifact is exactly `start, start+1, ...` with no gaps or repeats
pub fn assert_contiguous_from(path: &Path, start: BlockNumber) -> Vec<BlockNumber> {
    let numbers = read_block_numbers(path);
    for (offset, number) in numbers.iter().enumerate() {
        assert_eq!(
            *number,
            start + offset as u64,
            "gap or repeat at row {offset}: {numbers:?}"
        );
    }
    numbers
}

/// Wait for a terminal snapshot, failing the test after `timeout`
pub async fn wait_terminal(fetcher: &BlockFetcher, id: JobId, timeout: Duration) -> JobSnapshot {
    tokio::time::timeout(timeout, fetcher.wait(id))
        .await
        .expect("job did not finish in time")
        .unwrap()
}

/// Poll `condition` every 10ms until it holds, failing after `timeout`
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(timeout, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
