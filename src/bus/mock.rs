//! In-memory bus transport for tests and demos.
//!
//! `MockBus` simulates a shared bus with a configurable set of attached
//! probes and records every call it receives, so tests can assert both
//! behavior and strict call ordering (the ordering of select/write/read is
//! an invariant of the whole crate, not an implementation detail).

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use crate::bus::{BusAddress, BusTransport};
use crate::error::{Error, Result};
use crate::protocol::RESPONSE_LEN;

/// One recorded transport operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    /// An address selection.
    Select(BusAddress),
    /// A raw write with the exact bytes sent.
    Write(Vec<u8>),
    /// A raw read with the requested maximum length.
    Read(usize),
}

/// A simulated probe behind one bus address.
#[derive(Debug, Default)]
struct ProbeSim {
    /// Responses returned once each, in order, before the default applies.
    queue: VecDeque<Vec<u8>>,
    /// Response returned whenever the queue is empty.
    default: Option<Vec<u8>>,
}

/// An in-memory [`BusTransport`] with scripted responses.
#[derive(Debug, Default)]
pub struct MockBus {
    selected: Option<BusAddress>,
    calls: Vec<BusCall>,
    probes: HashMap<BusAddress, ProbeSim>,
}

impl MockBus {
    /// Create an empty bus with no probes attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a probe that answers every read with `default_response`.
    pub fn attach_probe(&mut self, address: BusAddress, default_response: Vec<u8>) {
        self.probes.entry(address).or_default().default = Some(default_response);
    }

    /// Attach a probe that accepts writes but fails every read.
    ///
    /// Useful for simulating a present-but-unresponsive device.
    pub fn attach_silent_probe(&mut self, address: BusAddress) {
        self.probes.entry(address).or_default();
    }

    /// Queue a one-shot response for the probe at `address`.
    ///
    /// Queued responses are returned in FIFO order before the probe's
    /// default response applies.
    pub fn queue_response(&mut self, address: BusAddress, response: Vec<u8>) {
        self.probes
            .entry(address)
            .or_default()
            .queue
            .push_back(response);
    }

    /// Build a null-padded success frame carrying an ASCII payload.
    ///
    /// Payloads longer than the frame can hold are truncated; a real board
    /// never produces more than fits in its fixed-size reply either.
    pub fn success_frame(payload: &str) -> Vec<u8> {
        let mut frame = vec![0u8; RESPONSE_LEN];
        frame[0] = 1;
        let len = payload.len().min(RESPONSE_LEN - 1);
        frame[1..=len].copy_from_slice(&payload.as_bytes()[..len]);
        frame
    }

    /// Build a null-padded frame whose status byte is `code`.
    pub fn error_frame(code: u8) -> Vec<u8> {
        let mut frame = vec![0u8; RESPONSE_LEN];
        frame[0] = code;
        frame
    }

    /// Every transport operation recorded so far, in call order.
    pub fn calls(&self) -> &[BusCall] {
        &self.calls
    }

    /// The command strings written so far, in call order.
    ///
    /// Decodes each recorded write as ASCII with the trailing null
    /// terminator removed.
    pub fn written_commands(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BusCall::Write(bytes) => {
                    let trimmed: Vec<u8> =
                        bytes.iter().copied().filter(|&b| b != 0).collect();
                    Some(String::from_utf8_lossy(&trimmed).into_owned())
                }
                _ => None,
            })
            .collect()
    }

    /// Forget all recorded calls, keeping probes and selection intact.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

#[async_trait]
impl BusTransport for MockBus {
    async fn select(&mut self, address: BusAddress) -> Result<()> {
        self.calls.push(BusCall::Select(address));
        self.selected = Some(address);
        Ok(())
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.calls.push(BusCall::Write(bytes.to_vec()));

        let address = self
            .selected
            .ok_or_else(|| Error::transport("write with no address selected"))?;
        if self.probes.contains_key(&address) {
            Ok(())
        } else {
            // A write to an empty address NAKs on real hardware.
            Err(Error::transport(format!(
                "no device at address {}",
                address
            )))
        }
    }

    async fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        self.calls.push(BusCall::Read(max_bytes));

        let address = self
            .selected
            .ok_or_else(|| Error::transport("read with no address selected"))?;
        let probe = self.probes.get_mut(&address).ok_or_else(|| {
            Error::transport(format!("no device at address {}", address))
        })?;

        let mut response = match probe.queue.pop_front().or_else(|| probe.default.clone()) {
            Some(response) => response,
            None => {
                return Err(Error::transport(format!(
                    "device at address {} did not respond",
                    address
                )))
            }
        };
        response.truncate(max_bytes);
        Ok(response)
    }

    fn selected(&self) -> Option<BusAddress> {
        self.selected
    }
}
