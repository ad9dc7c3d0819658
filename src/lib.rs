//! # atlas-ezo-i2c
//!
//! A Rust library for communicating with Atlas Scientific EZO sensor
//! circuits ("probes") over a shared multi-address I2C bus.
//!
//! One bus carries every probe; only one address is the active target at a
//! time, so a single driver issues every command in strict order. The crate
//! covers the command/response protocol, multi-probe polling, and bounded
//! in-memory buffering of readings with rollover to persistent storage.
//!
//! ## Features
//!
//! - **Discovery**: full bus sweep mapping factory addresses to probe kinds
//! - **Command protocol**: ASCII commands, null-terminated framing, status
//!   decoding with the documented top-bit correction for Raspberry Pi bus
//!   controllers
//! - **Wait classification**: read/calibration commands get the long ADC
//!   settling interval, sleep commands get none, everything else the short
//!   one
//! - **Polling cycles**: write all, wait once, read all; temperature
//!   readings feed pH compensation automatically
//! - **Bounded buffering**: snapshots accumulate in memory and the older
//!   half rolls over to a storage sink at capacity
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atlas_ezo_i2c::{Config, CsvFileSink, EzoClient, MockBus, Poller, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // On a Raspberry Pi, open LinuxI2cBus::open(1)? instead
//!     // (feature "linux-i2c").
//!     let bus = MockBus::new();
//!
//!     let mut client = EzoClient::new(bus, Config::default());
//!     let registry = client.discover().await?;
//!     println!("Found {} probes", registry.len());
//!
//!     let sink = CsvFileSink::new("probe_readings.csv");
//!     let mut poller = Poller::new(client, registry, Box::new(sink));
//!
//!     let snapshot = poller.run_cycle().await?;
//!     for (kind, reading) in snapshot.iter() {
//!         println!("{}: {}", kind, reading);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! The hardware transport targets the Linux `/dev/i2c-N` interface (feature
//! `linux-i2c`). Bus 1 is correct for current Raspberry Pi boards; some
//! older revisions use bus 0. The user may need to be in the `i2c` group.
//!
//! ## Feature Flags
//!
//! - `linux-i2c`: Linux i2c-dev hardware transport
//! - `serde`: serialization/deserialization for data types

// Public modules
pub mod bus;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod poll;
pub mod protocol;
pub mod registry;
pub mod storage;

// Re-exports for convenience
pub use bus::{BusAddress, BusTransport, MockBus};
pub use client::EzoClient;
pub use config::Config;
pub use data::{ReadingBuffer, ReadingSnapshot, ReadingValue};
pub use error::{Error, Result};
pub use poll::{Poller, POLL_COMMAND};
pub use protocol::{CommandClass, CommandOutcome};
pub use registry::{ProbeKind, ProbeRegistry};
pub use storage::{CsvFileSink, DiscardSink, StorageSink};

#[cfg(feature = "linux-i2c")]
pub use bus::LinuxI2cBus;
