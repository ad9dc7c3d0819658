//! Continuous polling against a simulated bus
//!
//! Run with: cargo run --example monitor
//!
//! Swap `simulated_bus()` for `LinuxI2cBus::open(1)?` (feature `linux-i2c`)
//! to drive real probes on a Raspberry Pi.

use atlas_ezo_i2c::{
    BusAddress, Config, CsvFileSink, EzoClient, MockBus, Poller, ProbeKind, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Build a mock bus with a pH, temperature, and conductivity probe wired up.
fn simulated_bus() -> MockBus {
    let mut bus = MockBus::new();
    bus.attach_probe(
        BusAddress::new(99).expect("valid address"),
        MockBus::success_frame("7.012"),
    );
    bus.attach_probe(
        BusAddress::new(102).expect("valid address"),
        MockBus::success_frame("21.500"),
    );
    bus.attach_probe(
        BusAddress::new(100).expect("valid address"),
        MockBus::success_frame("1413,703,0.72,1.02"),
    );
    bus
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Probe Monitor");
    println!("=============\n");

    let mut client = EzoClient::new(simulated_bus(), Config::default());

    let registry = client.discover().await?;
    println!("Discovered {} probes:", registry.len());
    for (kind, address) in registry.probes() {
        println!("  {:>3} : {}", address, kind);
    }
    println!();

    let sink = CsvFileSink::new("probe_readings.csv");
    let mut poller = Poller::new(client, registry, Box::new(sink));

    // Print snapshots as they are published.
    let mut rx = poller.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(snapshot) = rx.recv().await {
            let readings: Vec<String> = snapshot
                .iter()
                .map(|(kind, reading)| format!("{}={}", kind, reading))
                .collect();
            println!(
                "{}  {}",
                snapshot.timestamp.format("%H:%M:%S"),
                readings.join("  ")
            );
        }
    });

    // Stop gracefully between cycles on Ctrl+C.
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        println!("\nStopping after the current cycle...");
        stop_flag.store(true, Ordering::SeqCst);
    });

    println!("Polling... Press Ctrl+C to exit.\n");
    let cycles = poller.run_continuous(stop).await?;

    printer.abort();
    println!("\nCompleted {} cycles.", cycles);
    if let Some(snapshot) = poller.latest() {
        println!(
            "Last pH reading: {}",
            snapshot
                .value(ProbeKind::Ph)
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "--".to_string())
        );
    }

    Ok(())
}
