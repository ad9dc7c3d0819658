//! Bounded in-memory buffer of reading snapshots.

use std::collections::VecDeque;

use tracing::debug;

use crate::data::ReadingSnapshot;

/// A time-ordered buffer of snapshots with midpoint rollover.
///
/// Appends are O(1) amortized. When the buffer reaches its configured
/// capacity, [`ReadingBuffer::rollover`] hands the older half out as an
/// owned batch and keeps the newer half, so recent history stays available
/// in memory while the total footprint stays bounded.
#[derive(Debug, Clone)]
pub struct ReadingBuffer {
    samples: VecDeque<ReadingSnapshot>,
    max_samples: usize,
}

impl ReadingBuffer {
    /// Create a buffer that rolls over at `max_samples` entries.
    ///
    /// A capacity below 2 is raised to 2; rollover needs at least one
    /// sample on each side of the midpoint.
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples.min(4096)),
            max_samples: max_samples.max(2),
        }
    }

    /// Append a snapshot at the end of the sequence.
    pub fn append(&mut self, snapshot: ReadingSnapshot) {
        self.samples.push_back(snapshot);
    }

    /// Split off the older half if the buffer has reached capacity.
    ///
    /// Returns `None` below the threshold. At or above it, removes and
    /// returns the oldest `floor(len / 2)` snapshots; ownership of the
    /// batch transfers to the caller. Called after every append, the
    /// trigger fires once per crossing of the threshold because the
    /// post-rollover length is strictly below it.
    pub fn rollover(&mut self) -> Option<Vec<ReadingSnapshot>> {
        if self.samples.len() < self.max_samples {
            return None;
        }

        let half = self.samples.len() / 2;
        let batch: Vec<ReadingSnapshot> = self.samples.drain(..half).collect();
        debug!(
            "Buffer rollover: {} snapshots out, {} retained",
            batch.len(),
            self.samples.len()
        );
        Some(batch)
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Option<&ReadingSnapshot> {
        self.samples.back()
    }

    /// Iterate over buffered snapshots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ReadingSnapshot> {
        self.samples.iter()
    }

    /// Number of buffered snapshots.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no snapshots.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The configured rollover threshold.
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }
}
