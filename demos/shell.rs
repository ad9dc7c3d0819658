//! Interactive operator shell
//!
//! Run with: cargo run --example shell
//!
//! Commands:
//! - `LIST_ADDR`        list discovered probe addresses
//! - `USE <address>`    set the target for ad hoc commands
//! - `RUN`              poll continuously until Ctrl+C
//! - `QUIT`             exit
//! - anything else is sent to the target probe as-is (e.g. `R`, `I`,
//!   `Slope`, `CAL,MID,7.00`, `SLEEP`)

use atlas_ezo_i2c::{BusAddress, Config, CsvFileSink, EzoClient, MockBus, Poller};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default ad hoc target: the ORP circuit's factory address.
const DEFAULT_TARGET: u8 = 98;

fn simulated_bus() -> MockBus {
    let mut bus = MockBus::new();
    bus.attach_probe(
        BusAddress::new(98).expect("valid address"),
        MockBus::success_frame("245.1"),
    );
    bus.attach_probe(
        BusAddress::new(99).expect("valid address"),
        MockBus::success_frame("7.012"),
    );
    bus.attach_probe(
        BusAddress::new(102).expect("valid address"),
        MockBus::success_frame("21.500"),
    );
    bus
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("EZO Probe Shell");
    println!("===============\n");

    let mut client = EzoClient::new(simulated_bus(), Config::default());
    let registry = client.discover().await?;

    println!("Discovered probes:");
    for (kind, address) in registry.probes() {
        println!("  {:>3} : {}", address, kind);
    }
    for address in registry.unclassified() {
        println!("  {:>3} : (unclassified)", address);
    }
    println!();

    let sink = CsvFileSink::new("probe_readings.csv");
    let mut poller = Poller::new(client, registry, Box::new(sink));
    let mut target = BusAddress::new(DEFAULT_TARGET)?;

    loop {
        print!("Enter command: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            println!("Please input valid command.");
            continue;
        }

        let upper = input.to_ascii_uppercase();
        if upper.starts_with("LIST_ADDR") {
            for (kind, address) in poller.registry().probes() {
                println!("  {:>3} : {}", address, kind);
            }
            for address in poller.registry().unclassified() {
                println!("  {:>3} : (unclassified)", address);
            }
        } else if upper.starts_with("USE") {
            match input
                .split_whitespace()
                .nth(1)
                .and_then(|raw| raw.parse::<u8>().ok())
                .map(BusAddress::new)
            {
                Some(Ok(address)) => {
                    target = address;
                    println!("Target set to {}", target);
                }
                _ => println!("Usage: USE <address 0-127>"),
            }
        } else if upper.starts_with("RUN") {
            let stop = Arc::new(AtomicBool::new(false));
            let stop_flag = stop.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                stop_flag.store(true, Ordering::SeqCst);
            });

            let mut rx = poller.subscribe();
            let printer = tokio::spawn(async move {
                while let Ok(snapshot) = rx.recv().await {
                    let readings: Vec<String> = snapshot
                        .iter()
                        .map(|(kind, reading)| format!("{}={}", kind, reading))
                        .collect();
                    println!("{}", readings.join("  "));
                }
            });

            println!("Polling... Press Ctrl+C to stop.");
            poller.run_continuous(stop).await?;
            printer.abort();
            println!("Continuous polling stopped");
        } else if upper == "QUIT" || upper == "EXIT" {
            break;
        } else {
            // Unrecognized input goes straight to the target probe.
            match poller.client_mut().query(target, input).await {
                Ok(outcome) => println!("{}", outcome),
                Err(e) => println!(
                    "Query failed: {}\n - Address may be invalid, use LIST_ADDR to see available addresses",
                    e
                ),
            }
        }
    }

    println!("Bye.");
    Ok(())
}
