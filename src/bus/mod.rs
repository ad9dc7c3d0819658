//! Bus transport module.
//!
//! This module provides raw access to the shared multi-address bus:
//! address selection, raw writes, and raw reads. Everything above the byte
//! level (framing, timing, decoding) lives in [`crate::protocol`].

pub mod address;
pub mod mock;
pub mod transport;

pub use address::BusAddress;
pub use mock::{BusCall, MockBus};
pub use transport::BusTransport;

#[cfg(feature = "linux-i2c")]
pub use transport::LinuxI2cBus;
