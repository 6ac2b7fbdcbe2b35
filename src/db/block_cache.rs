//! Computed block records keyed by block number.

use async_trait::async_trait;
use sqlx::FromRow;

use crate::error::DatabaseError;
use crate::types::{BlockNumber, BlockRecord};
use crate::{Error, Result};

use super::{Database, RecordCache};

/// Row as stored in `block_cache`
#[derive(Debug, Clone, FromRow)]
struct BlockCacheRow {
    block_num: i64,
    timestamp: i64,
    gas_used: String,
    total_tips: String,
}

impl BlockCacheRow {
    fn into_record(self) -> Result<BlockRecord> {
        let corrupt = |field: &str, detail: String| {
            Error::Database(DatabaseError::CorruptRow(format!(
                "block {} {}: {}",
                self.block_num, field, detail
            )))
        };

        let number = u64::try_from(self.block_num)
            .map_err(|e| corrupt("block_num", e.to_string()))?;
        let timestamp =
            u64::try_from(self.timestamp).map_err(|e| corrupt("timestamp", e.to_string()))?;
        let gas_used = self
            .gas_used
            .parse::<u128>()
            .map_err(|e| corrupt("gas_used", e.to_string()))?;
        let tips = self
            .total_tips
            .parse::<u128>()
            .map_err(|e| corrupt("total_tips", e.to_string()))?;

        Ok(BlockRecord {
            number,
            timestamp,
            gas_used,
            tips,
        })
    }
}

/// SQLite stores INTEGER as i64
fn to_sql_int(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        Error::Database(DatabaseError::QueryFailed(format!(
            "{field} {value} exceeds SQLite integer range"
        )))
    })
}

impl Database {
    /// Get a cached block record
    pub async fn get_cached_block(&self, number: BlockNumber) -> Result<Option<BlockRecord>> {
        let key = to_sql_int(number, "block number")?;

        let row = sqlx::query_as::<_, BlockCacheRow>(
            "SELECT block_num, timestamp, gas_used, total_tips FROM block_cache WHERE block_num = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get cached block: {}",
                e
            )))
        })?;

        row.map(BlockCacheRow::into_record).transpose()
    }

    /// Insert or replace a cached block record
    pub async fn put_cached_block(&self, record: &BlockRecord) -> Result<()> {
        let key = to_sql_int(record.number, "block number")?;
        let timestamp = to_sql_int(record.timestamp, "timestamp")?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO block_cache (block_num, timestamp, gas_used, total_tips)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(timestamp)
        .bind(record.gas_used.to_string())
        .bind(record.tips.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to cache block: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Number of cached blocks
    pub async fn count_cached_blocks(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM block_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count cached blocks: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}

#[async_trait]
impl RecordCache for Database {
    async fn lookup(&self, number: BlockNumber) -> Result<Option<BlockRecord>> {
        self.get_cached_block(number).await
    }

    async fn store(&self, record: &BlockRecord) -> Result<()> {
        self.put_cached_block(record).await
    }
}
