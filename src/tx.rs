//! Transmit state machine
//!
//! ```text
//! IDLE -> START -> D0 -> D1 -> ... -> D7 -> PARITY -> STOP0 -> STOP1 -> IDLE
//! ```
//!
//! The machine moves only on baud ticks. The line level is a function of the
//! registered state, so it holds for the whole bit period:
//!
//! | State      | `o_tx`                          |
//! |------------|---------------------------------|
//! | IDLE       | 1                               |
//! | START      | 0                               |
//! | D0..D7     | shift register bit at cursor    |
//! | PARITY     | even parity of the data byte    |
//! | STOP0/1    | 1                               |
//!
//! Leaving IDLE consumes the TX FIFO head. There is no separate ready signal
//! here: whether a producer may enqueue is decided by FIFO occupancy alone.

use crate::frame::parity_bit;
use crate::shift::ShiftRegister;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// TX states in frame order. The discriminants match the RTL encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxState {
    #[default]
    Idle = 0,
    Start,
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    Parity,
    Stop0,
    Stop1,
}

impl TxState {
    const ALL: [Self; 13] = [
        Self::Idle,
        Self::Start,
        Self::D0,
        Self::D1,
        Self::D2,
        Self::D3,
        Self::D4,
        Self::D5,
        Self::D6,
        Self::D7,
        Self::Parity,
        Self::Stop0,
        Self::Stop1,
    ];

    const NAMES: [&'static str; 13] = [
        "TX_IDLE",
        "TX_START",
        "TX_D0",
        "TX_D1",
        "TX_D2",
        "TX_D3",
        "TX_D4",
        "TX_D5",
        "TX_D6",
        "TX_D7",
        "TX_PARITY",
        "TX_STOP0",
        "TX_STOP1",
    ];

    /// RTL state encoding
    #[must_use]
    pub const fn encoding(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_encoding(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Following state in frame order; STOP1 wraps to IDLE
    const fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(
            self,
            Self::D0 | Self::D1 | Self::D2 | Self::D3 | Self::D4 | Self::D5 | Self::D6 | Self::D7
        )
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened on one clock cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxStep {
    /// Byte taken from the FIFO head; the FIFO must pop on this edge
    pub loaded: Option<u8>,
    /// STOP1 finished and the machine is back in IDLE
    pub frame_done: bool,
}

#[derive(Clone, Debug)]
pub struct TxMachine {
    state: TxState,
    shift: ShiftRegister,
    /// Parity latched when leaving D7
    parity: bool,
}

impl Default for TxMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TxMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TxState::Idle,
            shift: ShiftRegister::new(),
            parity: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn state(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub const fn shift_register(&self) -> &ShiftRegister {
        &self.shift
    }

    /// Current level of `o_tx`
    #[must_use]
    pub const fn line(&self) -> bool {
        match self.state {
            TxState::Idle | TxState::Stop0 | TxState::Stop1 => true,
            TxState::Start => false,
            TxState::Parity => self.parity,
            _ => self.shift.current(),
        }
    }

    /// Advances one clock cycle.
    ///
    /// `head` is the TX FIFO head as seen before this edge.
    pub fn step(&mut self, baud_tick: bool, head: Option<u8>) -> TxStep {
        let mut step = TxStep::default();
        if !baud_tick {
            return step;
        }

        let next = match self.state {
            TxState::Idle => match head {
                Some(byte) => {
                    self.shift.load(byte);
                    step.loaded = Some(byte);
                    debug!("tx frame start {byte:#010b}");
                    TxState::Start
                }
                None => TxState::Idle,
            },
            TxState::D7 => {
                self.shift.shift_out();
                self.parity = parity_bit(self.shift.value());
                TxState::Parity
            }
            state if state.is_data() => {
                self.shift.shift_out();
                state.next()
            }
            TxState::Stop1 => {
                step.frame_done = true;
                debug!("tx frame done");
                TxState::Idle
            }
            state => state.next(),
        };

        if next != self.state {
            trace!(from = %self.state, to = %next, "tx transition");
        }
        self.state = next;
        step
    }
}
