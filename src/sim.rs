//! Simulation bench for the UART controller.
//!
//! Plays the role of the RTL testbench: it owns the clock, holds reset,
//! applies the baud divisor, drives the enqueue handshake and the serial
//! input, and optionally wires `o_tx` back into `i_rx`.
//!
//! ## Loopback
//!
//! With loopback enabled the `rx` input of each cycle is the `tx` output of
//! the previous one, which is what a testbench assigning `i_rx = o_tx`
//! between edges produces.
//!
//! ## Probing
//!
//! Tick edges are emitted as `trace` events from this module.
//! [`Simulator::probe`] formats the same state dump the RTL bench prints.

use crate::config::UartConfig;
use crate::error::{ConfigError, SimError};
use crate::frame::Frame;
use crate::uart::{UartController, UartInputs, UartOutputs, UartStatus};
use tracing::{debug, trace};

/// Default cycle budget for waits and runs
const DEFAULT_MAX_CYCLES: u64 = 10_000_000;

/// Outcome of [`Simulator::run_until`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// The condition held after this many cycles
    Done { cycles: u64 },
    /// The condition never held within the budget
    Timeout { cycles: u64 },
}

impl RunResult {
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

pub struct Simulator {
    uart: UartController,
    config: UartConfig,
    /// Pin values applied on every cycle
    drive: UartInputs,
    /// Outputs of the most recent cycle
    last: UartOutputs,
    loopback: bool,
    /// Level put on `i_rx` when loopback is off
    line: bool,
    cycle: u64,
    max_cycles: u64,
}

impl Simulator {
    /// Builds a bench around a fresh controller. Call [`Simulator::reset`]
    /// before driving traffic.
    pub fn new(config: UartConfig) -> Result<Self, ConfigError> {
        let mut uart = UartController::with_config(&config)?;
        let drive = UartInputs::default();
        // Settle the outputs without consuming a divisor
        let last = uart.step(&UartInputs { rst_n: false, ..drive });
        Ok(Self {
            uart,
            config,
            drive,
            last,
            loopback: false,
            line: true,
            cycle: 0,
            max_cycles: DEFAULT_MAX_CYCLES,
        })
    }

    #[must_use]
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &UartConfig {
        &self.config
    }

    #[must_use]
    pub const fn controller(&self) -> &UartController {
        &self.uart
    }

    /// Outputs of the most recent cycle
    #[must_use]
    pub const fn outputs(&self) -> &UartOutputs {
        &self.last
    }

    #[must_use]
    pub fn status(&self) -> UartStatus {
        self.uart.status()
    }

    #[must_use]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// Holds reset for the configured number of cycles, then releases it
    /// with the divisor applied.
    pub fn reset(&mut self) {
        debug!(cycles = self.config.reset_cycles, "holding reset");
        for _ in 0..self.config.reset_cycles {
            self.hold_reset();
        }
        self.set_baud_div(self.config.baud_div.divisor());
        self.release_reset();
    }

    /// Asserts reset for one cycle
    pub fn hold_reset(&mut self) {
        self.drive.rst_n = false;
        self.cycle();
    }

    /// Deasserts reset and runs the first cycle out of it
    pub fn release_reset(&mut self) {
        self.drive.rst_n = true;
        self.cycle();
    }

    /// Applies a raw value to `i_baud_div` (including zero)
    pub fn set_baud_div(&mut self, value: u32) {
        self.drive.baud_div = value;
    }

    pub fn set_loopback(&mut self, enabled: bool) {
        self.loopback = enabled;
    }

    /// Drives `i_rx` directly; only takes effect with loopback off
    pub fn inject_rx(&mut self, level: bool) {
        self.line = level;
    }

    /// Advances one clock cycle with the current pin values
    pub fn cycle(&mut self) -> &UartOutputs {
        let mut inputs = self.drive;
        inputs.rx = if self.loopback { self.last.tx } else { self.line };

        let previous = self.last;
        self.last = self.uart.step(&inputs);
        self.cycle += 1;

        if self.last.baud_tick && !previous.baud_tick {
            trace!(cycle = self.cycle, "baud tick");
        }
        if self.last.samp_tick && !previous.samp_tick {
            trace!(cycle = self.cycle, "sample tick");
        }
        &self.last
    }

    pub fn cycles(&mut self, count: u64) {
        for _ in 0..count {
            self.cycle();
        }
    }

    /// Steps until `done` holds for the latest outputs, or the cycle budget
    /// runs out.
    pub fn run_until(&mut self, mut done: impl FnMut(&UartOutputs) -> bool) -> RunResult {
        let mut cycles = 0;
        while cycles < self.max_cycles {
            self.cycle();
            cycles += 1;
            if done(&self.last) {
                return RunResult::Done { cycles };
            }
        }
        debug!(cycles, "run_until timed out");
        RunResult::Timeout { cycles }
    }

    /// Waits for `o_enq_tx_ready`, then presents `byte` with valid high for
    /// exactly one cycle. Returns the number of cycles spent.
    pub fn enqueue_tx(&mut self, byte: u8) -> Result<u64, SimError> {
        let mut waited = 0;
        while !self.last.enq_tx_ready {
            if waited >= self.max_cycles {
                return Err(SimError::EnqueueTimeout { cycles: waited });
            }
            self.cycle();
            waited += 1;
        }
        debug!("enqueuing tx {byte:#010b}");
        self.pulse_enqueue(byte);
        Ok(waited + 1)
    }

    /// Presents `byte` with valid high for one cycle regardless of ready.
    /// Returns whether the FIFO took it.
    pub fn pulse_enqueue(&mut self, byte: u8) -> bool {
        self.drive.enq_tx_data = byte;
        self.drive.enq_tx_valid = true;
        self.cycle();
        self.drive.enq_tx_valid = false;
        self.last.enq_tx_accepted
    }

    /// Raises the dequeue ready for one cycle and returns what was taken
    pub fn pulse_dequeue(&mut self) -> Option<u8> {
        self.drive.deq_rx_ready = true;
        self.cycle();
        self.drive.deq_rx_ready = false;
        self.last.rx_dequeued
    }

    /// Takes one byte from the RX FIFO if one is presented
    pub fn dequeue_rx(&mut self) -> Option<u8> {
        if !self.last.rx_valid {
            return None;
        }
        self.pulse_dequeue()
    }

    /// Empties the RX FIFO
    pub fn drain_rx(&mut self) -> Vec<u8> {
        std::iter::from_fn(|| self.dequeue_rx()).collect()
    }

    /// Clears the sticky error flags
    pub fn clear_status(&mut self) {
        self.drive.clear_status = true;
        self.cycle();
        self.drive.clear_status = false;
    }

    /// Puts a whole frame on `i_rx`, one divisor's worth of cycles per bit,
    /// and leaves the line idle afterwards. Turns loopback off.
    pub fn drive_frame(&mut self, frame: &Frame) {
        self.loopback = false;
        let period = u64::from(self.config.baud_div.divisor());
        for bit in frame.bits() {
            self.line = bit;
            self.cycles(period);
        }
        self.line = true;
    }

    /// Enqueues `bytes` in loopback and collects what comes back, draining
    /// the RX FIFO as it fills. Gives up with [`SimError::CycleLimit`] after
    /// a budget of 1.25 frames per byte plus two spare frames.
    pub fn loopback_transfer(&mut self, bytes: &[u8]) -> Result<Vec<u8>, SimError> {
        self.loopback = true;
        let mut received = Vec::with_capacity(bytes.len());
        let mut pending = bytes.iter().copied().peekable();
        let frame = self.config.baud_div.frame_cycles();
        let limit = (bytes.len() as u64 + 2) * (frame + frame / 4);
        let mut budget = limit;

        while received.len() < bytes.len() {
            if budget == 0 {
                debug!(limit, received = received.len(), "loopback transfer gave up");
                return Err(SimError::CycleLimit { limit });
            }
            if let Some(&byte) = pending.peek() {
                if self.last.enq_tx_ready && self.pulse_enqueue(byte) {
                    pending.next();
                }
            }
            if let Some(byte) = self.dequeue_rx() {
                received.push(byte);
            }
            self.cycle();
            budget = budget.saturating_sub(1);
        }
        Ok(received)
    }

    /// One-line state dump in the style of the RTL bench
    #[must_use]
    pub fn probe(&self) -> String {
        let status = self.uart.status();
        let out = &self.last;
        format!(
            "tx/rx: {} | tx_state: {} shfreg: {:08b} TX level: {}, TX full: {}, TX empty: {} \
             | rx_state: {} shfreg: {:08b} RX level: {}, RX full: {}, RX empty: {}",
            u8::from(out.tx),
            status.tx_state,
            status.tx_shift,
            out.tx_level,
            out.tx_full,
            out.tx_empty,
            status.rx_state,
            status.rx_shift,
            out.rx_level,
            out.rx_full,
            out.rx_empty,
        )
    }
}
