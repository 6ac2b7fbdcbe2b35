//! Block payload fixtures, a scripted remote source and fetcher setup

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use eth_fetcher::config::RetryConfig;
use eth_fetcher::{
    BlockFetcher, BlockNumber, BlockRecord, Config, Database, Error, RawBlock, RawTransaction,
    RecordCache, RecordSource, Result,
};

/// Base fee every fixture block carries (wei)
pub const BASE_FEE: u128 = 10;

/// Payload for `number`: one tipping transaction and one priced below the base fee
pub fn block_payload(number: BlockNumber) -> RawBlock {
    RawBlock {
        number: format!("0x{number:x}"),
        gas_used: format!("0x{:x}", number * 1_000),
        base_fee_per_gas: format!("0x{BASE_FEE:x}"),
        timestamp: format!("0x{:x}", 1_700_000_000 + number),
        transactions: vec![
            RawTransaction {
                gas_price: format!("0x{:x}", BASE_FEE + u128::from(number % 5)),
                gas: "0x5208".to_string(),
            },
            RawTransaction {
                gas_price: "0x2".to_string(),
                gas: "0x5208".to_string(),
            },
        ],
    }
}

/// Record computed from [`block_payload`]
pub fn expected_row(number: BlockNumber) -> String {
    let record = BlockRecord {
        number,
        timestamp: 1_700_000_000 + number,
        gas_used: u128::from(number) * 1_000,
        tips: u128::from(number % 5) * 21_000,
    };
    format!(
        "{},{},{},{}",
        record.number, record.timestamp, record.gas_used, record.tips
    )
}

/// Remote source that follows a per-block script and counts every call
#[derive(Default)]
pub struct ScriptedSource {
    calls: Mutex<HashMap<BlockNumber, u32>>,
    failures: Mutex<HashMap<BlockNumber, u32>>,
    hang: HashSet<BlockNumber>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `number` with an RPC error `times` times, then answer
    pub fn fail_times(self, number: BlockNumber, times: u32) -> Self {
        self.failures.lock().unwrap().insert(number, times);
        self
    }

    /// Never answer for `number`
    pub fn hang(mut self, number: BlockNumber) -> Self {
        self.hang.insert(number);
        self
    }

    /// Delay every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls_for(&self, number: BlockNumber) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&number)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch_block(&self, number: BlockNumber) -> Result<RawBlock> {
        *self.calls.lock().unwrap().entry(number).or_insert(0) += 1;

        if self.hang.contains(&number) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&number)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(Error::Rpc(format!("node overloaded at block {number}")));
            }
        }

        Ok(block_payload(number))
    }
}

/// Millisecond backoff without jitter
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

/// Config writing below `dir`, unlimited rate, fast retries
pub fn test_config(dir: &Path, batch_size: u64) -> Config {
    let mut config = Config::default();
    config.fetch.batch_size = batch_size;
    config.fetch.output_dir = dir.join("jobs");
    config.persistence.database_path = dir.join("cache.db");
    config.rate_limit.requests_per_second = 0;
    config.retry = fast_retry();
    config
}

/// A fetcher over `source` with a SQLite block cache in a fresh temp dir
pub async fn sqlite_fetcher(
    source: Arc<ScriptedSource>,
    batch_size: u64,
) -> (BlockFetcher, Arc<Database>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), batch_size);
    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .unwrap(),
    );
    let cache: Arc<dyn RecordCache> = db.clone();
    let fetcher = BlockFetcher::with_source(config, source, cache).unwrap();
    (fetcher, db, dir)
}

/// In-memory cache for tests running on paused time
#[derive(Default)]
pub struct MemoryCache {
    records: Mutex<HashMap<BlockNumber, BlockRecord>>,
}

#[async_trait]
impl RecordCache for MemoryCache {
    async fn lookup(&self, number: BlockNumber) -> Result<Option<BlockRecord>> {
        Ok(self.records.lock().unwrap().get(&number).cloned())
    }

    async fn store(&self, record: &BlockRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.number, record.clone());
        Ok(())
    }
}

/// A fetcher over `source` with an in-memory cache
pub fn memory_fetcher(source: Arc<ScriptedSource>, batch_size: u64) -> (BlockFetcher, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), batch_size);
    let fetcher =
        BlockFetcher::with_source(config, source, Arc::new(MemoryCache::default())).unwrap();
    (fetcher, dir)
}
