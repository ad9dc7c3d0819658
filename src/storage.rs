//! Storage sink for rolled-over snapshot batches.
//!
//! The polling core hands finished batches to a [`StorageSink`]; the sink
//! owns the on-disk format and any retention policy. Two implementations
//! ship with the crate: an appending CSV file and an explicit discard.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::data::ReadingSnapshot;
use crate::error::{Error, Result};
use crate::registry::ProbeKind;

/// Receives ownership of batches the reading buffer rolls over.
#[async_trait]
pub trait StorageSink: Send {
    /// Persist a completed batch of snapshots, oldest first.
    async fn persist(&mut self, batch: Vec<ReadingSnapshot>) -> Result<()>;
}

/// A sink that drops every batch.
///
/// Used when persistence is disabled by configuration; the drop is explicit
/// and logged, never silent.
#[derive(Debug, Default)]
pub struct DiscardSink;

#[async_trait]
impl StorageSink for DiscardSink {
    async fn persist(&mut self, batch: Vec<ReadingSnapshot>) -> Result<()> {
        debug!("Discarding batch of {} snapshots", batch.len());
        Ok(())
    }
}

/// A sink that appends batches to a CSV file.
///
/// Columns are the timestamp followed by one column per probe kind in
/// registry order; probes that were unavailable (or absent) in a given
/// cycle leave their cell empty. The header row is written once, when the
/// file is created or found empty.
#[derive(Debug)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    /// Create a sink that appends to the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The file this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header() -> String {
        let mut header = String::from("timestamp");
        for kind in ProbeKind::ALL {
            header.push(',');
            header.push_str(kind.firmware_name());
        }
        header.push('\n');
        header
    }

    fn row(snapshot: &ReadingSnapshot) -> String {
        let mut row = snapshot.timestamp.to_rfc3339();
        for kind in ProbeKind::ALL {
            row.push(',');
            if let Some(value) = snapshot.value(kind) {
                row.push_str(&format!("{:.3}", value));
            }
        }
        row.push('\n');
        row
    }
}

#[async_trait]
impl StorageSink for CsvFileSink {
    async fn persist(&mut self, batch: Vec<ReadingSnapshot>) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::transport(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        let needs_header = file
            .metadata()
            .await
            .map(|metadata| metadata.len() == 0)
            .unwrap_or(true);

        let mut out = String::new();
        if needs_header {
            out.push_str(&Self::header());
        }
        let count = batch.len();
        for snapshot in &batch {
            out.push_str(&Self::row(snapshot));
        }

        file.write_all(out.as_bytes()).await.map_err(|e| {
            Error::transport(format!("failed to write {}: {}", self.path.display(), e))
        })?;
        file.flush().await.map_err(|e| {
            Error::transport(format!("failed to flush {}: {}", self.path.display(), e))
        })?;

        info!(
            "Persisted {} snapshots to {}",
            count,
            self.path.display()
        );
        Ok(())
    }
}
