//! Fetch task execution -- the batch engine and the per-job lifecycle around it.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state for one job and its progress reporting
//! - [`engine`] - Batch partitioning, gapless-prefix walk, outcome decision
//! - [`batching`] - Concurrent per-block fetches for one batch
//! - [`orchestration`] - Top-level job lifecycle
//! - [`finalization`] - Terminal state bookkeeping

mod batching;
mod context;
mod engine;
mod finalization;
mod orchestration;


pub(crate) use context::FetchTaskContext;
pub use context::ProgressSink;
pub use engine::{FetchOutcome, FetchReport, run_range};
pub(crate) use orchestration::run_fetch_task;
