//! Database layer for eth-fetcher
//!
//! Handles SQLite persistence for the block cache.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`block_cache`] - Computed block records keyed by block number

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::error::Result;
use crate::types::{BlockNumber, BlockRecord};

mod block_cache;
mod migrations;

/// Keyed store of previously computed records
///
/// Consulted before every remote call and updated after every successful
/// one. Entries are never evicted; storing an existing key replaces it with
/// an identical value.
#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Look up a cached record
    async fn lookup(&self, number: BlockNumber) -> Result<Option<BlockRecord>>;

    /// Insert or replace a record
    async fn store(&self, record: &BlockRecord) -> Result<()>;
}

/// Database handle for eth-fetcher
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
