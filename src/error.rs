//! Error types for the atlas-ezo-i2c crate.

use crate::bus::BusAddress;
use crate::registry::ProbeKind;
use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The bus could not be addressed, written, or read.
    ///
    /// On a shared I2C bus this typically means the selected address has no
    /// device behind it, or the bus device itself failed.
    #[error("Bus transport fault: {context}")]
    Transport {
        /// Description of the underlying I/O failure.
        context: String,
    },

    /// An address outside the 7-bit I2C range was supplied.
    #[error("Invalid bus address: {address} (valid range is 0-127)")]
    InvalidAddress {
        /// The out-of-range value.
        address: u8,
    },

    /// The probe answered, but its status byte signaled an error.
    #[error("Device reported error status {code}")]
    Device {
        /// The raw status code from the response.
        code: u8,
    },

    /// The probe returned only null padding where a response was expected.
    #[error("No response from address {address}")]
    NoResponse {
        /// The address that was read.
        address: BusAddress,
    },

    /// A response was received but could not be interpreted.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// A probe's self-identification disagrees with the address table.
    ///
    /// This indicates a miswired bus or a stale address table, not a
    /// transient condition, and is surfaced as a hard error.
    #[error("Probe at address {address} identifies as \"{reported}\", expected {expected}")]
    KindMismatch {
        /// The address that was queried.
        address: BusAddress,
        /// The kind the address table maps this address to.
        expected: ProbeKind,
        /// The device name the probe actually reported.
        reported: String,
    },
}

impl Error {
    /// Convenience constructor for transport faults.
    pub(crate) fn transport(context: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
