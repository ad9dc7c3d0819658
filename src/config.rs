//! Timing, buffering, and persistence configuration.

use std::time::Duration;

/// Configuration for bus timing and the reading buffer.
///
/// The wait intervals are properties of the EZO firmware, not of any one
/// call site: read and calibration commands need time for the on-board ADC
/// conversion to settle, everything else answers quickly. The defaults
/// match the values the boards are documented with.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Wait after read ("R...") and calibration ("CAL...") commands.
    pub long_wait: Duration,
    /// Wait after every other command that expects a response.
    pub short_wait: Duration,
    /// Snapshot count at which the reading buffer rolls over to storage.
    pub max_buffered_samples: usize,
    /// Whether rolled-over batches are handed to the storage sink.
    ///
    /// When false, the older half of the buffer is discarded on rollover.
    /// This is an explicit opt-out, never a silent default.
    pub persist_on_flush: bool,
}

impl Config {
    /// Default wait for read and calibration commands.
    pub const DEFAULT_LONG_WAIT: Duration = Duration::from_millis(1500);
    /// Default wait for regular commands.
    pub const DEFAULT_SHORT_WAIT: Duration = Duration::from_millis(500);
    /// Default buffer capacity: one hour of once-per-second sampling.
    pub const DEFAULT_MAX_BUFFERED_SAMPLES: usize = 60 * 60;

    /// Set the long wait interval.
    pub fn with_long_wait(mut self, wait: Duration) -> Self {
        self.long_wait = wait;
        self
    }

    /// Set the short wait interval.
    pub fn with_short_wait(mut self, wait: Duration) -> Self {
        self.short_wait = wait;
        self
    }

    /// Set the buffer rollover threshold.
    pub fn with_max_buffered_samples(mut self, max: usize) -> Self {
        self.max_buffered_samples = max;
        self
    }

    /// Enable or disable persistence of rolled-over batches.
    pub fn with_persist_on_flush(mut self, persist: bool) -> Self {
        self.persist_on_flush = persist;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            long_wait: Self::DEFAULT_LONG_WAIT,
            short_wait: Self::DEFAULT_SHORT_WAIT,
            max_buffered_samples: Self::DEFAULT_MAX_BUFFERED_SAMPLES,
            persist_on_flush: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.long_wait, Duration::from_millis(1500));
        assert_eq!(config.short_wait, Duration::from_millis(500));
        assert_eq!(config.max_buffered_samples, 3600);
        assert!(config.persist_on_flush);
    }

    #[test]
    fn test_builder_helpers() {
        let config = Config::default()
            .with_long_wait(Duration::from_millis(900))
            .with_short_wait(Duration::from_millis(300))
            .with_max_buffered_samples(10)
            .with_persist_on_flush(false);

        assert_eq!(config.long_wait, Duration::from_millis(900));
        assert_eq!(config.short_wait, Duration::from_millis(300));
        assert_eq!(config.max_buffered_samples, 10);
        assert!(!config.persist_on_flush);
    }
}
