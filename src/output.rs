//! Append-only CSV artifact for a job
//!
//! The fetch engine appends the contiguous prefix of each batch, so the file
//! always holds `start..cursor` in ascending order. Appended rows stay in
//! memory until [`OutputWriter::flush`], which commits them with a single
//! write. A failed flush is rolled back, so the file never holds more rows
//! than the last successful flush reported.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::types::BlockRecord;

/// Header row of every artifact
pub const CSV_HEADER: &str = "block_number,timestamp,gas_used,tips";

/// Writer for one job's CSV artifact
#[derive(Debug)]
pub struct OutputWriter {
    path: PathBuf,
    file: File,
    /// Rows appended since the last flush
    pending: String,
    pending_rows: u64,
    /// Bytes on disk as of the last successful flush
    len: u64,
    rows: u64,
}

impl OutputWriter {
    /// Create (or truncate) the artifact, write the header and flush it.
    ///
    /// Missing parent directories are created.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let header = format!("{CSV_HEADER}\n");
        let mut file = File::create(&path).await?;
        file.write_all(header.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), "Opened output artifact");

        Ok(Self {
            path,
            file,
            pending: String::new(),
            pending_rows: 0,
            len: header.len() as u64,
            rows: 0,
        })
    }

    /// Queue one row for the next flush
    pub fn append(&mut self, record: &BlockRecord) {
        let _ = writeln!(
            self.pending,
            "{},{},{},{}",
            record.number, record.timestamp, record.gas_used, record.tips
        );
        self.pending_rows += 1;
    }

    /// Write every queued row to the file in one go.
    ///
    /// On error the file is truncated back to its length after the previous
    /// flush and the queued rows are discarded.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let pending_rows = std::mem::take(&mut self.pending_rows);

        if let Err(e) = self.write_through(pending.as_bytes()).await {
            if let Err(rollback) = self.file.set_len(self.len).await {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to roll back partial write"
                );
            }
            return Err(e);
        }

        self.len += pending.len() as u64;
        self.rows += pending_rows;
        Ok(())
    }

    async fn write_through(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        Ok(())
    }

    /// Artifact location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows on disk as of the last flush (excluding the header)
    pub fn rows(&self) -> u64 {
        self.rows
    }
}
