//! Probe client: transport + timing + decode in one place.
//!
//! [`EzoClient::query`] is the only operation in the crate that combines
//! address selection, framing, the wait interval, and response decoding.
//! Its `&mut self` receiver keeps queries atomic with respect to each other
//! on the shared bus.

use tokio::time::sleep;
use tracing::{debug, info};

use crate::bus::{BusAddress, BusTransport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{decode, encode, CommandClass, CommandOutcome, RESPONSE_LEN};
use crate::registry::{ProbeKind, ProbeRegistry};

/// Acknowledgement returned for sleep commands, which get no response read.
pub const SLEEP_ACK: &str = "sleep mode";

/// A client for issuing commands to probes on one shared bus.
pub struct EzoClient<T> {
    transport: T,
    config: Config,
}

impl<T: BusTransport> EzoClient<T> {
    /// Create a client over a transport with the given configuration.
    pub fn new(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct access to the underlying transport.
    ///
    /// Used by the polling cycle, which writes to many probes before a
    /// single shared wait instead of paying one wait per query.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Sweep the bus and build a registry of present probes.
    pub async fn discover(&mut self) -> Result<ProbeRegistry> {
        ProbeRegistry::discover(&mut self.transport).await
    }

    /// Issue one command to one probe and decode its response.
    ///
    /// Selects the address, writes the encoded command, waits the interval
    /// its class requires, then reads and decodes the response. Sleep
    /// commands short-circuit to [`SLEEP_ACK`] without a read, since the
    /// board stops answering once it powers down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the bus itself fails. A probe that
    /// answers with an error status is not an `Err`: it comes back as
    /// [`CommandOutcome::DeviceError`] so callers can tell "no such address"
    /// apart from "device says error".
    pub async fn query(&mut self, address: BusAddress, command: &str) -> Result<CommandOutcome> {
        debug!("Query {:?} to address {}", command, address);

        self.transport.select(address).await?;
        self.transport.write_raw(&encode(command)).await?;

        let class = CommandClass::classify(command);
        match class.required_wait(&self.config) {
            Some(wait) => sleep(wait).await,
            None => {
                debug!("Sleep command issued to address {}", address);
                return Ok(CommandOutcome::Success(SLEEP_ACK.to_string()));
            }
        }

        let raw = self.transport.read_raw(RESPONSE_LEN).await?;
        Ok(decode(&raw))
    }

    /// Ask the probe at `address` to identify itself.
    ///
    /// Issues the "I" command and returns the device-name field of the
    /// reply (e.g. `"pH"` out of `"?I,pH,1.98"`).
    pub async fn device_info(&mut self, address: BusAddress) -> Result<String> {
        match self.query(address, "I").await? {
            CommandOutcome::Success(payload) => {
                let name = payload
                    .split(',')
                    .nth(1)
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| Error::InvalidData {
                        context: format!("malformed identification reply: {:?}", payload),
                    })?;
                Ok(name.to_string())
            }
            CommandOutcome::DeviceError(code) => Err(Error::Device { code }),
            CommandOutcome::TransportError => Err(Error::NoResponse { address }),
        }
    }

    /// Verify that every typed probe reports the kind the table expects.
    ///
    /// Optional diagnostics for catching a miswired bus or stale address
    /// table. Unlike per-cycle read failures this is a hard error: a
    /// mismatch is a configuration problem, not a transient one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KindMismatch`] on the first disagreement, or any
    /// transport error from the identification queries.
    pub async fn verify_registry(&mut self, registry: &ProbeRegistry) -> Result<()> {
        for (expected, address) in registry.probes() {
            let reported = self.device_info(address).await?;
            match ProbeKind::from_firmware_name(&reported) {
                Some(kind) if kind == expected => {
                    debug!("Probe at {} verified as {}", address, expected);
                }
                _ => {
                    return Err(Error::KindMismatch {
                        address,
                        expected,
                        reported,
                    });
                }
            }
        }
        info!("All {} typed probes verified", registry.len());
        Ok(())
    }
}
