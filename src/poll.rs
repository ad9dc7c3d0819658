//! The multi-probe polling cycle.
//!
//! One cycle runs Writing → Waiting → Reading → Complete: write the poll
//! command to every present probe, sleep the long interval once for the
//! whole set, then read every probe back and assemble a snapshot. The
//! single shared wait is what keeps a full cycle at O(1) long waits instead
//! of one per probe.
//!
//! A probe that fails mid-cycle is marked unavailable in the snapshot and
//! the cycle carries on; even a cycle where every probe fails produces a
//! (fully unavailable) snapshot. Continuous polling must keep producing
//! data across bus hiccups, so availability wins over strictness here.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::bus::{BusAddress, BusTransport};
use crate::client::EzoClient;
use crate::data::{ReadingBuffer, ReadingSnapshot, ReadingValue};
use crate::error::{Error, Result};
use crate::protocol::{decode, encode, CommandOutcome, RESPONSE_LEN};
use crate::registry::{ProbeKind, ProbeRegistry};
use crate::storage::StorageSink;

/// The command written to every probe during the Writing phase.
pub const POLL_COMMAND: &str = "R";

/// Drives polling cycles over a discovered set of probes.
///
/// Owns the client (and through it the bus), the registry, the reading
/// buffer, and the storage sink. A single `Poller` is the single bus driver
/// the crate's ordering model assumes; `&mut self` on every bus-touching
/// method enforces that at compile time.
pub struct Poller<T> {
    client: EzoClient<T>,
    registry: ProbeRegistry,
    buffer: ReadingBuffer,
    sink: Box<dyn StorageSink>,
    /// Most recent temperature reading, feeding pH compensation.
    last_temperature: Option<f64>,
    snapshot_tx: broadcast::Sender<ReadingSnapshot>,
}

impl<T: BusTransport> Poller<T> {
    /// Create a poller over a client, a discovered registry, and a sink.
    pub fn new(client: EzoClient<T>, registry: ProbeRegistry, sink: Box<dyn StorageSink>) -> Self {
        let buffer = ReadingBuffer::new(client.config().max_buffered_samples);
        let (snapshot_tx, _) = broadcast::channel(32);
        Self {
            client,
            registry,
            buffer,
            sink,
            last_temperature: None,
            snapshot_tx,
        }
    }

    /// The registry this poller was built with.
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// The buffered snapshots not yet rolled over to storage.
    pub fn buffer(&self) -> &ReadingBuffer {
        &self.buffer
    }

    /// The most recent snapshot, if any cycle has completed.
    pub fn latest(&self) -> Option<&ReadingSnapshot> {
        self.buffer.latest()
    }

    /// Access the client for ad hoc queries between cycles.
    ///
    /// Ad hoc queries and polling cycles share one bus, so they go through
    /// the same exclusive driver rather than a second handle.
    pub fn client_mut(&mut self) -> &mut EzoClient<T> {
        &mut self.client
    }

    /// Subscribe to snapshots as continuous polling produces them.
    pub fn subscribe(&self) -> broadcast::Receiver<ReadingSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run one full polling cycle and return its snapshot.
    ///
    /// Re-entrant: call repeatedly for continuous polling. Per-probe
    /// failures never fail the cycle; the only error path is the storage
    /// sink rejecting a rolled-over batch.
    pub async fn run_cycle(&mut self) -> Result<ReadingSnapshot> {
        let probes: Vec<(ProbeKind, BusAddress)> = self.registry.probes().collect();

        // Writing: poll command to every probe, compensation first for pH.
        trace!("Cycle phase: writing to {} probes", probes.len());
        for &(kind, address) in &probes {
            if let Err(e) = self.write_poll(kind, address).await {
                warn!("Write to {} probe at {} failed: {}", kind, address, e);
            }
        }

        // Waiting: one shared long wait covers every write above.
        trace!("Cycle phase: waiting");
        sleep(self.client.config().long_wait).await;

        // Reading: collect every probe's response, keeping failures as
        // unavailable markers.
        trace!("Cycle phase: reading");
        let mut readings = BTreeMap::new();
        for &(kind, address) in &probes {
            let value = match self.read_value(address).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("Read from {} probe at {} failed: {}", kind, address, e);
                    ReadingValue::Unavailable
                }
            };
            if kind == ProbeKind::Temperature {
                if let ReadingValue::Measured(celsius) = value {
                    self.last_temperature = Some(celsius);
                }
            }
            readings.insert(kind, value);
        }

        // Complete: one snapshot per cycle, no matter what failed.
        let snapshot = ReadingSnapshot::new(readings);
        if snapshot.is_all_unavailable() && !snapshot.is_empty() {
            warn!("Every probe failed this cycle; recording all-unavailable snapshot");
        }

        self.buffer.append(snapshot.clone());
        if let Some(batch) = self.buffer.rollover() {
            if self.client.config().persist_on_flush {
                self.sink.persist(batch).await?;
            } else {
                debug!(
                    "Persistence disabled; dropping {} rolled-over snapshots",
                    batch.len()
                );
            }
        }

        let _ = self.snapshot_tx.send(snapshot.clone());
        Ok(snapshot)
    }

    /// Poll continuously until the stop flag is raised.
    ///
    /// The flag is checked between cycles only; a cycle in flight always
    /// runs to completion, so a stop request never tears down the bus
    /// mid-conversation. Returns the number of cycles completed.
    pub async fn run_continuous(&mut self, stop: Arc<AtomicBool>) -> Result<u64> {
        info!("Starting continuous polling");
        let mut cycles = 0u64;
        while !stop.load(Ordering::SeqCst) {
            self.run_cycle().await?;
            cycles += 1;
        }
        info!("Continuous polling stopped after {} cycles", cycles);
        Ok(cycles)
    }

    /// Issue the Writing-phase commands for one probe.
    ///
    /// For the pH probe, when a temperature probe is also present and a
    /// prior temperature reading exists, the compensation command goes out
    /// before the poll command. With no prior reading the compensation is
    /// skipped and the board keeps its last-known value.
    async fn write_poll(&mut self, kind: ProbeKind, address: BusAddress) -> Result<()> {
        let transport = self.client.transport_mut();
        transport.select(address).await?;

        if kind == ProbeKind::Ph && self.registry.contains(ProbeKind::Temperature) {
            if let Some(celsius) = self.last_temperature {
                let compensation = format!("T,{:.2}", celsius);
                debug!("Compensating pH probe with {}", compensation);
                transport.write_raw(&encode(&compensation)).await?;
            }
        }

        transport.write_raw(&encode(POLL_COMMAND)).await
    }

    /// Read and decode one probe's response during the Reading phase.
    async fn read_value(&mut self, address: BusAddress) -> Result<ReadingValue> {
        let transport = self.client.transport_mut();
        transport.select(address).await?;
        let raw = transport.read_raw(RESPONSE_LEN).await?;

        match decode(&raw) {
            CommandOutcome::Success(payload) => match parse_reading(&payload) {
                Some(value) => Ok(ReadingValue::Measured(value)),
                None => {
                    debug!("Unparseable reading payload: {:?}", payload);
                    Ok(ReadingValue::Unavailable)
                }
            },
            CommandOutcome::DeviceError(code) => Err(Error::Device { code }),
            CommandOutcome::TransportError => Err(Error::NoResponse { address }),
        }
    }
}

/// Parse the numeric reading out of a response payload.
///
/// EC circuits report comma-separated fields; the first one is the reading.
fn parse_reading(payload: &str) -> Option<f64> {
    payload
        .split(',')
        .next()
        .map(str::trim)
        .and_then(|field| field.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use crate::config::Config;
    use crate::storage::DiscardSink;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn addr(value: u8) -> BusAddress {
        BusAddress::new(value).unwrap()
    }

    fn fast_config() -> Config {
        Config::default()
            .with_long_wait(Duration::from_millis(1))
            .with_short_wait(Duration::from_millis(1))
    }

    /// Sink that records the size of every batch it receives.
    struct RecordingSink {
        batches: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl StorageSink for RecordingSink {
        async fn persist(&mut self, batch: Vec<ReadingSnapshot>) -> Result<()> {
            self.batches.lock().unwrap().push(batch.len());
            Ok(())
        }
    }

    async fn poller_with(bus: MockBus, config: Config) -> Poller<MockBus> {
        let mut client = EzoClient::new(bus, config);
        let registry = client.discover().await.unwrap();
        Poller::new(client, registry, Box::new(DiscardSink))
    }

    #[tokio::test]
    async fn test_cycle_reads_every_present_probe() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        bus.attach_probe(addr(102), MockBus::success_frame("21.500"));
        let mut poller = poller_with(bus, fast_config()).await;

        let snapshot = poller.run_cycle().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.value(ProbeKind::Ph), Some(7.01));
        assert_eq!(snapshot.value(ProbeKind::Temperature), Some(21.5));
        assert_eq!(poller.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_with_every_read_failing_still_snapshots() {
        // Each probe answers the discovery read once, then goes silent, so
        // both are registered but every cycle read fails.
        let mut bus = MockBus::new();
        bus.attach_silent_probe(addr(99));
        bus.attach_silent_probe(addr(102));
        bus.queue_response(addr(99), MockBus::success_frame("7.01"));
        bus.queue_response(addr(102), MockBus::success_frame("21.500"));
        let mut poller = poller_with(bus, fast_config()).await;
        assert_eq!(poller.registry().len(), 2);

        let snapshot = poller.run_cycle().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.is_all_unavailable());
        assert_eq!(poller.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_device_error_marks_only_that_probe_unavailable() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::error_frame(2));
        bus.attach_probe(addr(102), MockBus::success_frame("21.500"));
        let mut poller = poller_with(bus, fast_config()).await;

        let snapshot = poller.run_cycle().await.unwrap();
        assert_eq!(
            snapshot.reading(ProbeKind::Ph),
            Some(ReadingValue::Unavailable)
        );
        assert_eq!(snapshot.value(ProbeKind::Temperature), Some(21.5));
    }

    #[tokio::test]
    async fn test_first_cycle_skips_compensation() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        bus.attach_probe(addr(102), MockBus::success_frame("21.500"));
        let mut poller = poller_with(bus, fast_config()).await;
        poller.client_mut().transport_mut().clear_calls();

        poller.run_cycle().await.unwrap();

        // No prior temperature reading exists, so only poll writes go out.
        let commands = poller.client_mut().transport_mut().written_commands();
        assert_eq!(commands, vec!["R".to_string(), "R".to_string()]);
    }

    #[tokio::test]
    async fn test_compensation_write_precedes_ph_poll() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        bus.attach_probe(addr(102), MockBus::success_frame("21.500"));
        let mut poller = poller_with(bus, fast_config()).await;

        // First cycle records a temperature; second cycle compensates.
        poller.run_cycle().await.unwrap();
        poller.client_mut().transport_mut().clear_calls();
        poller.run_cycle().await.unwrap();

        let commands = poller.client_mut().transport_mut().written_commands();
        assert_eq!(
            commands,
            vec![
                "T,21.50".to_string(), // compensation to the pH probe
                "R".to_string(),       // pH poll
                "R".to_string(),       // temperature poll
            ]
        );
    }

    #[tokio::test]
    async fn test_no_compensation_without_temperature_probe() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        let mut poller = poller_with(bus, fast_config()).await;

        poller.run_cycle().await.unwrap();
        poller.client_mut().transport_mut().clear_calls();
        poller.run_cycle().await.unwrap();

        let commands = poller.client_mut().transport_mut().written_commands();
        assert_eq!(commands, vec!["R".to_string()]);
    }

    #[tokio::test]
    async fn test_rollover_persists_oldest_half() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            batches: batches.clone(),
        };

        let config = fast_config().with_max_buffered_samples(4);
        let mut client = EzoClient::new(bus, config);
        let registry = client.discover().await.unwrap();
        let mut poller = Poller::new(client, registry, Box::new(sink));

        for _ in 0..4 {
            poller.run_cycle().await.unwrap();
        }

        assert_eq!(batches.lock().unwrap().as_slice(), &[2]);
        assert_eq!(poller.buffer().len(), 2);
    }

    #[tokio::test]
    async fn test_persist_disabled_discards_without_sink_call() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            batches: batches.clone(),
        };

        let config = fast_config()
            .with_max_buffered_samples(4)
            .with_persist_on_flush(false);
        let mut client = EzoClient::new(bus, config);
        let registry = client.discover().await.unwrap();
        let mut poller = Poller::new(client, registry, Box::new(sink));

        for _ in 0..4 {
            poller.run_cycle().await.unwrap();
        }

        assert!(batches.lock().unwrap().is_empty());
        assert_eq!(poller.buffer().len(), 2);
    }

    #[tokio::test]
    async fn test_continuous_polling_stops_between_cycles() {
        let mut bus = MockBus::new();
        bus.attach_probe(addr(99), MockBus::success_frame("7.01"));
        let mut poller = poller_with(bus, fast_config()).await;

        let stop = Arc::new(AtomicBool::new(false));
        let mut rx = poller.subscribe();

        let stopper = stop.clone();
        let watcher = tokio::spawn(async move {
            // Stop after the first published snapshot.
            let snapshot = rx.recv().await.unwrap();
            stopper.store(true, Ordering::SeqCst);
            snapshot
        });

        let cycles = poller.run_continuous(stop).await.unwrap();
        assert!(cycles >= 1);
        let snapshot = watcher.await.unwrap();
        assert_eq!(snapshot.value(ProbeKind::Ph), Some(7.01));
    }

    #[test]
    fn test_parse_reading() {
        assert_eq!(parse_reading("21.500"), Some(21.5));
        assert_eq!(parse_reading(" 7.01 "), Some(7.01));
        assert_eq!(parse_reading("1413,703,0.72,1.02"), Some(1413.0));
        assert_eq!(parse_reading("*OK"), None);
        assert_eq!(parse_reading(""), None);
    }
}
