//! Bus address newtype.
//!
//! I2C uses 7-bit slave addresses, so anything above 127 can never be a
//! valid target on the bus.

use crate::error::{Error, Result};

/// A validated 7-bit bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusAddress(u8);

impl BusAddress {
    /// Lowest valid address.
    pub const MIN: u8 = 0;
    /// Highest valid 7-bit address.
    pub const MAX: u8 = 0x7F;

    /// Create a new address, validating the 7-bit range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for values above 127.
    pub fn new(value: u8) -> Result<Self> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(Error::InvalidAddress { address: value })
        }
    }

    /// Construct from a value already known to be in range.
    ///
    /// Used for the fixed default address table; callers guarantee
    /// `value <= 127`.
    pub(crate) const fn from_known(value: u8) -> Self {
        Self(value)
    }

    /// Get the raw address value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Iterate over every address in the valid range, lowest first.
    pub fn scan_range() -> impl Iterator<Item = BusAddress> {
        (Self::MIN..=Self::MAX).map(BusAddress)
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl std::fmt::Display for BusAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{:#04x}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}
