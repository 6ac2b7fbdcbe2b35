//! Core types for eth-fetcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Block number on the remote chain
pub type BlockNumber = u64;

/// Unique identifier for a range-fetch job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Allocate a fresh random job identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Closed interval `[start, end]` of block numbers requested by one job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlockRange {
    /// First block (inclusive)
    pub start: BlockNumber,
    /// Last block (inclusive)
    pub end: BlockNumber,
}

impl BlockRange {
    /// Validate and build a range.
    ///
    /// `end` must be below `u64::MAX` so the progress cursor (`end + 1` once
    /// complete) stays representable.
    pub fn new(start: BlockNumber, end: BlockNumber) -> Result<Self> {
        if start > end || end == BlockNumber::MAX {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of blocks in the range
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A valid range always holds at least one block
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Split the range into ascending inclusive batches of at most `batch_size` blocks.
    ///
    /// The tail batch is clamped to `end`. A `batch_size` of 0 is treated as 1.
    pub fn batches(&self, batch_size: u64) -> Batches {
        Batches {
            next: Some(self.start),
            end: self.end,
            size: batch_size.max(1),
        }
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Iterator over the batches of a [`BlockRange`]
#[derive(Debug, Clone)]
pub struct Batches {
    next: Option<BlockNumber>,
    end: BlockNumber,
    size: u64,
}

impl Iterator for Batches {
    type Item = RangeInclusive<BlockNumber>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.size - 1).min(self.end);
        self.next = end.checked_add(1).filter(|n| *n <= self.end);
        Some(start..=end)
    }
}

/// One fetched block, reduced to the fields written to the output artifact
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block number
    pub number: BlockNumber,
    /// Block timestamp (unix seconds)
    pub timestamp: u64,
    /// Total gas used by the block
    pub gas_used: u128,
    /// Sum of priority tips paid to the block producer, in wei
    pub tips: u128,
}

impl BlockRecord {
    /// Compute a record from a raw block payload.
    ///
    /// Per transaction the tip is `(gasPrice - baseFee) * gas`; a negative
    /// difference counts as zero before it is summed.
    pub fn from_raw(number: BlockNumber, raw: &RawBlock) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedPayload {
            block: number,
            reason,
        };

        let timestamp = parse_hex_quantity(&raw.timestamp)
            .map_err(|e| malformed(format!("timestamp: {e}")))?;
        let timestamp = u64::try_from(timestamp)
            .map_err(|_| malformed("timestamp does not fit in 64 bits".to_string()))?;
        let gas_used =
            parse_hex_quantity(&raw.gas_used).map_err(|e| malformed(format!("gasUsed: {e}")))?;
        let base_fee = parse_hex_quantity(&raw.base_fee_per_gas)
            .map_err(|e| malformed(format!("baseFeePerGas: {e}")))?;

        let mut tips: u128 = 0;
        for (index, tx) in raw.transactions.iter().enumerate() {
            let gas_price = parse_hex_quantity(&tx.gas_price)
                .map_err(|e| malformed(format!("transaction {index} gasPrice: {e}")))?;
            let gas = parse_hex_quantity(&tx.gas)
                .map_err(|e| malformed(format!("transaction {index} gas: {e}")))?;
            let tip = gas_price.saturating_sub(base_fee);
            tips = tip
                .checked_mul(gas)
                .and_then(|t| tips.checked_add(t))
                .ok_or_else(|| malformed(format!("tip total overflows at transaction {index}")))?;
        }

        Ok(Self {
            number,
            timestamp,
            gas_used,
            tips,
        })
    }
}

/// Block payload as returned by `eth_getBlockByNumber` with full transactions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    /// Block number (hex quantity)
    #[serde(default)]
    pub number: String,
    /// Gas used (hex quantity)
    #[serde(default)]
    pub gas_used: String,
    /// Base fee per gas (hex quantity, absent before EIP-1559)
    #[serde(default)]
    pub base_fee_per_gas: String,
    /// Block timestamp (hex quantity)
    #[serde(default)]
    pub timestamp: String,
    /// Full transaction objects
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

/// Transaction fields used for tip computation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Effective gas price (hex quantity)
    #[serde(default)]
    pub gas_price: String,
    /// Gas limit of the transaction (hex quantity)
    #[serde(default)]
    pub gas: String,
}

/// Parse a `0x`-prefixed hex quantity. An empty string is zero.
pub fn parse_hex_quantity(value: &str) -> std::result::Result<u128, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| format!("invalid hex quantity {value:?}: {e}"))
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submitted, worker not yet fetching
    Pending,
    /// Fetching batches
    Running,
    /// Every block in the range was written
    Done,
    /// Cancelled; the written prefix is kept
    Stopped,
    /// Ended by a non-retryable failure; the written prefix is kept
    Error,
}

impl JobState {
    /// `done`, `stopped` and `error` never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Stopped | JobState::Error)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Stopped => "stopped",
            JobState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a job, safe to hand to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Job identifier
    #[schema(value_type = String)]
    pub id: JobId,
    /// Lifecycle state
    pub state: JobState,
    /// First requested block
    pub start: BlockNumber,
    /// Last requested block
    pub end: BlockNumber,
    /// Next block expected in the output (`start` until something is written)
    pub cursor: BlockNumber,
    /// Highest block durably written, if any
    pub last_written: Option<BlockNumber>,
    /// Output artifact location, once opened
    #[schema(value_type = Option<String>)]
    pub file_path: Option<PathBuf>,
    /// Last error message, once failed
    pub error: Option<String>,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

/// Result of asking the registry to cancel a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// Cancellation was signalled; the worker will stop at its next check
    Stopping,
    /// The job had already reached a terminal state; nothing changed
    AlreadyFinished,
}
