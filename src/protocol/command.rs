//! Command encoding and wait classification.
//!
//! EZO commands are plain ASCII strings (`"R"`, `"CAL,MID,7.00"`, `"I"`,
//! `"Slope"`, `"SLEEP"`) sent with a trailing null terminator. How long the
//! board needs before its response is ready depends only on the command
//! class, so the class is derived from the command text itself.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::Config;

/// Terminator byte appended to every outgoing command.
pub const COMMAND_TERMINATOR: u8 = 0x00;

/// Encode a command string into its wire bytes.
///
/// Appends the null terminator; no other transformation is applied.
pub fn encode(command: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(command.len() + 1);
    buf.put(command.as_bytes());
    buf.put_u8(COMMAND_TERMINATOR);
    buf.freeze()
}

/// Wait-interval class of a command.
///
/// Classification is case-insensitive and based on the command prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    /// Read commands ("R..."): on-board ADC conversion, long wait.
    Read,
    /// Calibration commands ("CAL..."): calibration settling, long wait.
    Calibration,
    /// Sleep commands ("SLEEP..."): the board goes quiet, no wait, no read.
    Sleep,
    /// Everything else: short wait.
    Other,
}

impl CommandClass {
    /// Classify a command string.
    pub fn classify(command: &str) -> Self {
        let upper = command.to_ascii_uppercase();
        if upper.starts_with("CAL") {
            Self::Calibration
        } else if upper.starts_with('R') {
            Self::Read
        } else if upper.starts_with("SLEEP") {
            Self::Sleep
        } else {
            Self::Other
        }
    }

    /// The wait this class requires before reading a response.
    ///
    /// `None` means the command gets no response read at all.
    pub fn required_wait(&self, config: &Config) -> Option<Duration> {
        match self {
            Self::Read | Self::Calibration => Some(config.long_wait),
            Self::Other => Some(config.short_wait),
            Self::Sleep => None,
        }
    }

    /// Whether a response read should follow the write.
    pub fn expects_response(&self) -> bool {
        !matches!(self, Self::Sleep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_appends_terminator() {
        assert_eq!(encode("R").as_ref(), b"R\0");
        assert_eq!(encode("CAL,MID,7.00").as_ref(), b"CAL,MID,7.00\0");
        assert_eq!(encode("").as_ref(), b"\0");
    }

    #[test]
    fn test_classify_read_and_calibration_are_long() {
        let config = Config::default();
        for command in ["R", "r", "READ", "CAL,MID,7.00", "cal,clear", "Cal,dry"] {
            let class = CommandClass::classify(command);
            assert_eq!(
                class.required_wait(&config),
                Some(config.long_wait),
                "command {:?} should take the long wait",
                command
            );
        }
    }

    #[test]
    fn test_classify_sleep_has_no_wait() {
        let config = Config::default();
        for command in ["SLEEP", "sleep", "Sleep"] {
            let class = CommandClass::classify(command);
            assert_eq!(class, CommandClass::Sleep);
            assert_eq!(class.required_wait(&config), None);
            assert!(!class.expects_response());
        }
    }

    #[test]
    fn test_classify_other_is_short() {
        let config = Config::default();
        for command in ["I", "Slope", "T,25.00", "Status", "L,1"] {
            let class = CommandClass::classify(command);
            assert_eq!(class, CommandClass::Other);
            assert_eq!(class.required_wait(&config), Some(config.short_wait));
        }
    }

    proptest! {
        #[test]
        fn prop_r_prefix_is_always_long(suffix in "[ -~]{0,10}") {
            let command = format!("R{}", suffix);
            let class = CommandClass::classify(&command);
            prop_assert_eq!(class, CommandClass::Read);
        }

        #[test]
        fn prop_cal_prefix_is_always_long(suffix in "[ -~]{0,10}") {
            let command = format!("CAL{}", suffix);
            let class = CommandClass::classify(&command);
            prop_assert_eq!(class, CommandClass::Calibration);
        }

        #[test]
        fn prop_every_command_has_exactly_one_class(command in "[ -~]{0,12}") {
            let config = Config::default();
            let class = CommandClass::classify(&command);
            let upper = command.to_ascii_uppercase();
            if upper.starts_with("CAL") || upper.starts_with('R') {
                prop_assert_eq!(class.required_wait(&config), Some(config.long_wait));
            } else if upper.starts_with("SLEEP") {
                prop_assert_eq!(class.required_wait(&config), None);
            } else {
                prop_assert_eq!(class.required_wait(&config), Some(config.short_wait));
            }
        }
    }
}
