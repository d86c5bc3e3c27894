//! Command-line runner: resets the controller, sends bytes through loopback
//! and reports what came back.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uartsim_lib::{BaudConfig, Simulator, UartConfig};

#[derive(Parser, Debug)]
#[command(name = "uartsim", version, about = "Cycle-accurate UART controller simulation")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Baud divisor (clock cycles per bit), overrides the config file
    #[arg(short, long)]
    baud_div: Option<u32>,

    /// Byte to send; accepts decimal, 0x hex or 0b binary. Repeatable.
    #[arg(long = "byte", value_parser = parse_byte)]
    bytes: Vec<u8>,

    /// Cycles to run after enqueuing when loopback is off
    #[arg(long, default_value_t = 10_000)]
    cycles: u64,

    /// Leave i_rx idle instead of wiring it to o_tx
    #[arg(long)]
    no_loopback: bool,

    /// Print the final status as JSON
    #[arg(long)]
    json: bool,

    /// Log filter, e.g. `debug` or `uartsim_lib=trace`
    #[arg(long, default_value = "info")]
    log: String,
}

fn parse_byte(text: &str) -> Result<u8, String> {
    let parsed = if let Some(bin) = text.strip_prefix("0b") {
        u8::from_str_radix(&bin.replace('_', ""), 2)
    } else if let Some(hex) = text.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|e| format!("invalid byte `{text}`: {e}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => UartConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => UartConfig::default(),
    };
    if let Some(divisor) = args.baud_div {
        config.baud_div = BaudConfig::new(divisor)?;
    }

    let bytes = if args.bytes.is_empty() {
        vec![0b1100_1011]
    } else {
        args.bytes
    };
    let mut sim = Simulator::new(config)?;
    sim.reset();

    let received = if args.no_loopback {
        send_idle(&mut sim, &bytes, args.cycles)?
    } else {
        send_loopback(&mut sim, &bytes)?
    };

    for byte in &received {
        println!("{byte:08b} ({byte:#04x})");
    }
    let status = sim.status();
    println!(
        "sent {} frame(s), received {} byte(s), {} cycles",
        status.counters.frames_sent,
        received.len(),
        sim.cycle_count()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    if status.parity_error || status.framing_error || status.overflow {
        bail!("line errors reported: {}", sim.probe());
    }
    Ok(())
}

/// Sends with `i_rx` held idle and reports whatever the RX FIFO holds after
/// `cycles` more cycles.
fn send_idle(sim: &mut Simulator, bytes: &[u8], cycles: u64) -> Result<Vec<u8>> {
    for &byte in bytes {
        sim.enqueue_tx(byte)?;
    }
    sim.cycles(cycles);
    Ok(sim.drain_rx())
}

/// Sends through loopback, draining RX while enqueuing, and fails unless
/// every byte comes back.
fn send_loopback(sim: &mut Simulator, bytes: &[u8]) -> Result<Vec<u8>> {
    let received = sim
        .loopback_transfer(bytes)
        .with_context(|| format!("loopback transfer stalled: {}", sim.probe()))?;
    if received != bytes {
        bail!("sent {} byte(s) but {} came back", bytes.len(), received.len());
    }
    Ok(received)
}
