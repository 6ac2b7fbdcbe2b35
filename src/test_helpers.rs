//! Shared fakes for unit tests: a scripted remote source and in-memory caches.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{Config, RetryConfig};
use crate::db::RecordCache;
use crate::error::{DatabaseError, Error, Result};
use crate::rate_limiter::RateLimiter;
use crate::source::{RateLimitedSource, RecordSource};
use crate::types::{BlockNumber, BlockRecord, RawBlock, RawTransaction};

/// Deterministic payload for a block number
pub(crate) fn raw_block(number: BlockNumber) -> RawBlock {
    RawBlock {
        number: format!("0x{number:x}"),
        gas_used: format!("0x{:x}", number * 1_000),
        base_fee_per_gas: "0xa".to_string(),
        timestamp: format!("0x{:x}", 1_600_000_000 + number),
        transactions: vec![
            RawTransaction {
                gas_price: format!("0x{:x}", 10 + number % 7),
                gas: "0x5208".to_string(),
            },
            // below base fee, contributes nothing
            RawTransaction {
                gas_price: "0x1".to_string(),
                gas: "0x5208".to_string(),
            },
        ],
    }
}

/// Record the fetch pipeline should produce for `number`
pub(crate) fn expected_record(number: BlockNumber) -> BlockRecord {
    BlockRecord {
        number,
        timestamp: 1_600_000_000 + number,
        gas_used: u128::from(number) * 1_000,
        tips: u128::from(number % 7) * 21_000,
    }
}

/// Remote source with per-block scripted behaviour that counts every call
#[derive(Default)]
pub(crate) struct ScriptedSource {
    calls: Mutex<HashMap<BlockNumber, u32>>,
    failures: Mutex<HashMap<BlockNumber, u32>>,
    malformed: HashSet<BlockNumber>,
    hang: HashSet<BlockNumber>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail `number` with a transient error `times` times before succeeding
    pub(crate) fn fail_times(self, number: BlockNumber, times: u32) -> Self {
        self.failures.lock().unwrap().insert(number, times);
        self
    }

    /// Return an undecodable payload for `number`
    pub(crate) fn malformed(mut self, number: BlockNumber) -> Self {
        self.malformed.insert(number);
        self
    }

    /// Never answer for `number`
    pub(crate) fn hang(mut self, number: BlockNumber) -> Self {
        self.hang.insert(number);
        self
    }

    /// Delay every answer
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls_for(&self, number: BlockNumber) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&number)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> u32 {
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
                return Err(Error::Rpc(format!("scripted failure for block {number}")));
            }
        }

        if self.malformed.contains(&number) {
            return Ok(RawBlock {
                timestamp: "0xnot-hex".to_string(),
                ..raw_block(number)
            });
        }

        Ok(raw_block(number))
    }
}

/// In-memory [`RecordCache`]
#[derive(Default)]
pub(crate) struct MemoryCache {
    records: Mutex<HashMap<BlockNumber, BlockRecord>>,
}

impl MemoryCache {
    pub(crate) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub(crate) fn insert(&self, record: BlockRecord) {
        self.records.lock().unwrap().insert(record.number, record);
    }
}

#[async_trait]
impl RecordCache for MemoryCache {
    async fn lookup(&self, number: BlockNumber) -> Result<Option<BlockRecord>> {
        Ok(self.records.lock().unwrap().get(&number).cloned())
    }

    async fn store(&self, record: &BlockRecord) -> Result<()> {
        self.insert(record.clone());
        Ok(())
    }
}

/// Cache whose every operation fails
#[derive(Default)]
pub(crate) struct BrokenCache;

#[async_trait]
impl RecordCache for BrokenCache {
    async fn lookup(&self, _number: BlockNumber) -> Result<Option<BlockRecord>> {
        Err(Error::Database(DatabaseError::QueryFailed(
            "disk I/O error".to_string(),
        )))
    }

    async fn store(&self, _record: &BlockRecord) -> Result<()> {
        Err(Error::Database(DatabaseError::QueryFailed(
            "disk I/O error".to_string(),
        )))
    }
}

/// Millisecond backoff without jitter
pub(crate) fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

/// Unlimited, fast-retrying source over the given fakes
pub(crate) fn rate_limited(
    source: Arc<dyn RecordSource>,
    cache: Arc<dyn RecordCache>,
) -> RateLimitedSource {
    RateLimitedSource::new(source, cache, RateLimiter::unlimited(), fast_retry())
}

/// Config for engine tests writing below `dir`
pub(crate) fn test_config(dir: &std::path::Path, batch_size: u64) -> Config {
    let mut config = Config::default();
    config.fetch.batch_size = batch_size;
    config.fetch.output_dir = dir.join("jobs");
    config.persistence.database_path = dir.join("cache.db");
    config.rate_limit.requests_per_second = 0;
    config.retry = fast_retry();
    config
}
