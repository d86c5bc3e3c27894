//! UART controller top level
//!
//! Wires the baud generator, both state machines and both FIFOs together and
//! exposes the signal-level boundary of the RTL:
//!
//! | Signal            | Direction | Field                         |
//! |-------------------|-----------|-------------------------------|
//! | `i_rst_n`         | in        | [`UartInputs::rst_n`]         |
//! | `i_baud_div`      | in        | [`UartInputs::baud_div`]      |
//! | `i_enq_tx_data`   | in        | [`UartInputs::enq_tx_data`]   |
//! | `i_enq_tx_valid`  | in        | [`UartInputs::enq_tx_valid`]  |
//! | `o_enq_tx_ready`  | out       | [`UartOutputs::enq_tx_ready`] |
//! | `i_deq_rx_ready`  | in        | [`UartInputs::deq_rx_ready`]  |
//! | `o_rx_data/valid` | out       | [`UartOutputs::rx_data`]      |
//! | `i_rx`            | in        | [`UartInputs::rx`]            |
//! | `o_tx`            | out       | [`UartOutputs::tx`]           |
//! | `o_tx_level` etc. | out       | FIFO level/full/empty fields  |
//! | `w_baud_tick`     | debug     | [`UartOutputs::baud_tick`]    |
//! | `w_samp_tick`     | debug     | [`UartOutputs::samp_tick`]    |
//!
//! ## Timing
//!
//! [`UartController::step`] is one rising clock edge. Every block computes
//! from the state the previous edge left behind, then all updates are
//! committed together, so no block sees another block's update from the
//! same edge. In particular a byte enqueued on edge `n` is visible to the TX
//! machine on edge `n + 1`, and a byte completed by RX on edge `n` can be
//! dequeued on edge `n + 1`.
//!
//! ## Status flags
//!
//! `parity_error`, `framing_error` and `overflow` are sticky. They are set by
//! the offending frame and stay set until reset or a `clear_status` pulse.
//! Bytes from errored frames are dropped, as are bytes completed while the RX
//! FIFO is full.

use crate::baud::{BaudGenerator, Ticks};
use crate::config::UartConfig;
use crate::error::ConfigError;
use crate::fifo::Fifo;
use crate::rx::{RxEvent, RxMachine, RxState};
use crate::tx::{TxMachine, TxState};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// Input pins sampled on one clock edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UartInputs {
    /// Active-low synchronous reset
    pub rst_n: bool,
    pub baud_div: u32,
    pub enq_tx_data: u8,
    pub enq_tx_valid: bool,
    /// Consumer takes the RX FIFO head on this edge
    pub deq_rx_ready: bool,
    /// Serial input line
    pub rx: bool,
    /// Clears the sticky error flags
    pub clear_status: bool,
}

impl Default for UartInputs {
    fn default() -> Self {
        Self {
            rst_n: true,
            baud_div: 0,
            enq_tx_data: 0,
            enq_tx_valid: false,
            deq_rx_ready: false,
            rx: true,
            clear_status: false,
        }
    }
}

/// Output pins after one clock edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct UartOutputs {
    /// Serial output line
    pub tx: bool,
    /// TX FIFO can take a byte on the next edge
    pub enq_tx_ready: bool,
    /// The byte presented on this edge was stored in the TX FIFO
    pub enq_tx_accepted: bool,
    /// RX FIFO head, valid when `rx_valid`
    pub rx_data: u8,
    pub rx_valid: bool,
    /// Byte handed to the consumer on this edge
    pub rx_dequeued: Option<u8>,
    pub tx_level: usize,
    pub tx_full: bool,
    pub tx_empty: bool,
    pub rx_level: usize,
    pub rx_full: bool,
    pub rx_empty: bool,
    pub baud_tick: bool,
    pub samp_tick: bool,
    pub parity_error: bool,
    pub framing_error: bool,
    pub overflow: bool,
}

/// Event counters, never cleared except by reset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UartCounters {
    pub bytes_enqueued: u64,
    pub bytes_dequeued: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub parity_errors: u64,
    pub framing_errors: u64,
    pub overflows: u64,
    pub glitches: u64,
}

/// Point-in-time view of the controller for probing and reporting
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UartStatus {
    pub divisor: Option<u32>,
    pub tx_state: TxState,
    pub rx_state: RxState,
    pub tx_shift: u8,
    pub rx_shift: u8,
    pub tx_level: usize,
    pub rx_level: usize,
    pub parity_error: bool,
    pub framing_error: bool,
    pub overflow: bool,
    pub counters: UartCounters,
}

#[derive(Clone, Copy, Debug, Default)]
struct StatusFlags {
    parity_error: bool,
    framing_error: bool,
    overflow: bool,
}

/// The controller. Owns every FIFO, shift register and state machine.
#[derive(Clone, Debug)]
pub struct UartController {
    baud: BaudGenerator,
    tx: TxMachine,
    rx: RxMachine,
    tx_fifo: Fifo,
    rx_fifo: Fifo,
    flags: StatusFlags,
    counters: UartCounters,
    in_reset: bool,
}

impl UartController {
    /// Creates a controller with both FIFOs `fifo_depth` entries deep.
    ///
    /// The controller starts in the post-reset state with no divisor latched.
    pub fn new(fifo_depth: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            baud: BaudGenerator::new(),
            tx: TxMachine::new(),
            rx: RxMachine::new(),
            tx_fifo: Fifo::new(fifo_depth)?,
            rx_fifo: Fifo::new(fifo_depth)?,
            flags: StatusFlags::default(),
            counters: UartCounters::default(),
            in_reset: false,
        })
    }

    pub fn with_config(config: &UartConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.fifo_depth)
    }

    fn reset(&mut self) {
        self.baud.reset();
        self.tx.reset();
        self.rx.reset();
        self.tx_fifo.clear();
        self.rx_fifo.clear();
        self.flags = StatusFlags::default();
        self.counters = UartCounters::default();
    }

    /// One rising clock edge
    pub fn step(&mut self, inputs: &UartInputs) -> UartOutputs {
        let ticks = self.baud.step(inputs.rst_n, inputs.baud_div);

        if !inputs.rst_n {
            if !self.in_reset {
                debug!("reset asserted");
            }
            self.in_reset = true;
            self.reset();
            return self.outputs(ticks, false, None);
        }
        if self.in_reset {
            debug!("reset released");
            self.in_reset = false;
        }

        // Combinational phase: everything below reads pre-edge state
        let tx_ready = !self.tx_fifo.full();
        let tx_step = self.tx.step(ticks.baud, self.tx_fifo.peek());
        let rx_event = self.rx.step(ticks.sample, inputs.rx, self.baud.samples_per_bit());

        if inputs.clear_status {
            trace!("status flags cleared");
            self.flags = StatusFlags::default();
        }

        let completed = match rx_event {
            Some(RxEvent::Received(byte)) => {
                self.counters.frames_received += 1;
                Some(byte)
            }
            Some(RxEvent::Rejected { parity, framing, .. }) => {
                if parity {
                    self.flags.parity_error = true;
                    self.counters.parity_errors += 1;
                }
                if framing {
                    self.flags.framing_error = true;
                    self.counters.framing_errors += 1;
                }
                None
            }
            Some(RxEvent::GlitchRejected) => {
                self.counters.glitches += 1;
                None
            }
            None => None,
        };
        if tx_step.frame_done {
            self.counters.frames_sent += 1;
        }

        // Register phase
        let push = (inputs.enq_tx_valid && tx_ready).then_some(inputs.enq_tx_data);
        let tx_cycle = self.tx_fifo.clock(push, tx_step.loaded.is_some());
        debug_assert_eq!(tx_cycle.popped, tx_step.loaded);
        if tx_cycle.accepted {
            self.counters.bytes_enqueued += 1;
        } else if inputs.enq_tx_valid {
            trace!("tx enqueue stalled, FIFO full");
        }

        let rx_cycle = self.rx_fifo.clock(completed, inputs.deq_rx_ready);
        if let Some(byte) = completed {
            if !rx_cycle.accepted {
                warn!("rx overflow, dropped {byte:#010b}");
                self.flags.overflow = true;
                self.counters.overflows += 1;
            }
        }
        if rx_cycle.popped.is_some() {
            self.counters.bytes_dequeued += 1;
        }

        self.outputs(ticks, tx_cycle.accepted, rx_cycle.popped)
    }

    fn outputs(&self, ticks: Ticks, accepted: bool, dequeued: Option<u8>) -> UartOutputs {
        UartOutputs {
            tx: self.tx.line(),
            enq_tx_ready: !self.in_reset && !self.tx_fifo.full(),
            enq_tx_accepted: accepted,
            rx_data: self.rx_fifo.peek().unwrap_or(0),
            rx_valid: !self.rx_fifo.empty(),
            rx_dequeued: dequeued,
            tx_level: self.tx_fifo.level(),
            tx_full: self.tx_fifo.full(),
            tx_empty: self.tx_fifo.empty(),
            rx_level: self.rx_fifo.level(),
            rx_full: self.rx_fifo.full(),
            rx_empty: self.rx_fifo.empty(),
            baud_tick: ticks.baud,
            samp_tick: ticks.sample,
            parity_error: self.flags.parity_error,
            framing_error: self.flags.framing_error,
            overflow: self.flags.overflow,
        }
    }

    #[must_use]
    pub const fn tx_state(&self) -> TxState {
        self.tx.state()
    }

    #[must_use]
    pub const fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    #[must_use]
    pub const fn tx_fifo(&self) -> &Fifo {
        &self.tx_fifo
    }

    #[must_use]
    pub const fn rx_fifo(&self) -> &Fifo {
        &self.rx_fifo
    }

    #[must_use]
    pub const fn baud(&self) -> &BaudGenerator {
        &self.baud
    }

    #[must_use]
    pub const fn counters(&self) -> &UartCounters {
        &self.counters
    }

    #[must_use]
    pub fn status(&self) -> UartStatus {
        UartStatus {
            divisor: self.baud.config().map(u32::from),
            tx_state: self.tx.state(),
            rx_state: self.rx.state(),
            tx_shift: self.tx.shift_register().value(),
            rx_shift: self.rx.shift_register().value(),
            tx_level: self.tx_fifo.level(),
            rx_level: self.rx_fifo.level(),
            parity_error: self.flags.parity_error,
            framing_error: self.flags.framing_error,
            overflow: self.flags.overflow,
            counters: self.counters,
        }
    }
}
