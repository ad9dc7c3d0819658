//! Data structures for probe readings.
//!
//! This module contains the types produced by the polling cycle: per-probe
//! reading values, per-cycle snapshots, and the bounded buffer that holds
//! them between storage rollovers.

pub mod buffer;
pub mod snapshot;

pub use buffer::ReadingBuffer;
pub use snapshot::{ReadingSnapshot, ReadingValue};
