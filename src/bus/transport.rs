//! Bus transport abstraction.
//!
//! The transport is a pure byte pipe with one piece of state: the currently
//! selected slave address. Framing, timing, and decoding live in the
//! protocol layer; the transport only moves bytes.

use async_trait::async_trait;

use crate::bus::BusAddress;
use crate::error::Result;

/// Raw access to a shared multi-address bus.
///
/// The selected address is global bus state shared by every probe, so all
/// operations must run in strict program order from a single caller. The
/// `&mut self` receivers make that exclusivity a compile-time property; no
/// internal locking is provided.
#[async_trait]
pub trait BusTransport: Send {
    /// Switch the active bus target for subsequent reads and writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the bus
    /// cannot address that slave.
    async fn select(&mut self, address: BusAddress) -> Result<()>;

    /// Send exactly the given bytes to the selected target.
    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `max_bytes` from the selected target.
    ///
    /// Returns exactly the bytes received with no decoding. No timeout is
    /// enforced here; timing is the protocol layer's responsibility.
    async fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>>;

    /// The currently selected address, if one has been selected.
    fn selected(&self) -> Option<BusAddress>;
}

/// Transport over a Linux `/dev/i2c-N` character device.
///
/// Address selection maps to the `I2C_SLAVE` ioctl, which is how the kernel
/// models the shared-bus "current target" state this crate is built around.
#[cfg(feature = "linux-i2c")]
pub struct LinuxI2cBus {
    device: i2cdev::linux::LinuxI2CDevice,
    selected: Option<BusAddress>,
}

#[cfg(feature = "linux-i2c")]
impl LinuxI2cBus {
    /// Open the I2C bus with the given index (e.g. `1` for `/dev/i2c-1`).
    ///
    /// Bus 1 is the default on current Raspberry Pi boards; some older
    /// revisions use bus 0.
    pub fn open(bus_index: u8) -> Result<Self> {
        use crate::error::Error;

        let path = format!("/dev/i2c-{}", bus_index);
        let device = i2cdev::linux::LinuxI2CDevice::new(&path, 0)
            .map_err(|e| Error::transport(format!("failed to open {}: {}", path, e)))?;

        tracing::info!("Opened I2C bus {}", path);

        Ok(Self {
            device,
            selected: None,
        })
    }
}

#[cfg(feature = "linux-i2c")]
#[async_trait]
impl BusTransport for LinuxI2cBus {
    async fn select(&mut self, address: BusAddress) -> Result<()> {
        use crate::error::Error;

        self.device
            .set_slave_address(address.value() as u16)
            .map_err(|e| Error::transport(format!("failed to select address {}: {}", address, e)))?;
        self.selected = Some(address);
        Ok(())
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        use crate::error::Error;
        use i2cdev::core::I2CDevice;

        self.device
            .write(bytes)
            .map_err(|e| Error::transport(format!("bus write failed: {}", e)))
    }

    async fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        use crate::error::Error;
        use i2cdev::core::I2CDevice;

        let mut buf = vec![0u8; max_bytes];
        self.device
            .read(&mut buf)
            .map_err(|e| Error::transport(format!("bus read failed: {}", e)))?;
        Ok(buf)
    }

    fn selected(&self) -> Option<BusAddress> {
        self.selected
    }
}
