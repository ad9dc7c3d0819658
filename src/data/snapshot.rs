//! Per-cycle reading snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::registry::ProbeKind;

/// The outcome of reading one probe during a cycle.
///
/// A failed read is a normal data value here, not an error: per-probe
/// failures never abort a polling cycle, they just leave a marker in the
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReadingValue {
    /// A decoded numeric reading.
    Measured(f64),
    /// The probe's read failed this cycle.
    Unavailable,
}

impl ReadingValue {
    /// Whether a measurement was obtained.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Measured(_))
    }

    /// The numeric value, if one was measured.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Measured(value) => Some(*value),
            Self::Unavailable => None,
        }
    }
}

impl std::fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Measured(value) => write!(f, "{:.3}", value),
            Self::Unavailable => f.write_str("--"),
        }
    }
}

/// One polling cycle's readings across all present probes.
///
/// Immutable once created; the polling cycle builds exactly one per pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadingSnapshot {
    /// When the cycle completed.
    pub timestamp: DateTime<Utc>,
    /// Per-probe readings, keyed in registry order.
    readings: BTreeMap<ProbeKind, ReadingValue>,
}

impl ReadingSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(readings: BTreeMap<ProbeKind, ReadingValue>) -> Self {
        Self::at(Utc::now(), readings)
    }

    /// Create a snapshot with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, readings: BTreeMap<ProbeKind, ReadingValue>) -> Self {
        Self {
            timestamp,
            readings,
        }
    }

    /// The reading recorded for a probe kind, if that kind was polled.
    pub fn reading(&self, kind: ProbeKind) -> Option<ReadingValue> {
        self.readings.get(&kind).copied()
    }

    /// The numeric value for a probe kind, if measured this cycle.
    pub fn value(&self, kind: ProbeKind) -> Option<f64> {
        self.reading(kind).and_then(|reading| reading.value())
    }

    /// Iterate over the readings in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (ProbeKind, ReadingValue)> + '_ {
        self.readings.iter().map(|(&kind, &value)| (kind, value))
    }

    /// Number of probes represented in this snapshot.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the snapshot covers no probes at all.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Whether every probe in the snapshot failed this cycle.
    pub fn is_all_unavailable(&self) -> bool {
        self.readings
            .values()
            .all(|reading| !reading.is_available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReadingSnapshot {
        let mut readings = BTreeMap::new();
        readings.insert(ProbeKind::Ph, ReadingValue::Measured(7.01));
        readings.insert(ProbeKind::Temperature, ReadingValue::Unavailable);
        ReadingSnapshot::new(readings)
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = sample();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.value(ProbeKind::Ph), Some(7.01));
        assert_eq!(snapshot.value(ProbeKind::Temperature), None);
        assert_eq!(
            snapshot.reading(ProbeKind::Temperature),
            Some(ReadingValue::Unavailable)
        );
        assert_eq!(snapshot.reading(ProbeKind::Pump), None);
        assert!(!snapshot.is_all_unavailable());
    }

    #[test]
    fn test_all_unavailable() {
        let mut readings = BTreeMap::new();
        readings.insert(ProbeKind::Ph, ReadingValue::Unavailable);
        readings.insert(ProbeKind::Conductivity, ReadingValue::Unavailable);
        let snapshot = ReadingSnapshot::new(readings);
        assert!(snapshot.is_all_unavailable());

        let empty = ReadingSnapshot::new(BTreeMap::new());
        assert!(empty.is_all_unavailable());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_display_marks_unavailable() {
        assert_eq!(ReadingValue::Measured(7.0).to_string(), "7.000");
        assert_eq!(ReadingValue::Unavailable.to_string(), "--");
    }

    #[test]
    fn test_iteration_follows_registry_order() {
        let snapshot = sample();
        let kinds: Vec<ProbeKind> = snapshot.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![ProbeKind::Ph, ProbeKind::Temperature]);
    }
}
