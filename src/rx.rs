//! Receive state machine
//!
//! ```text
//! IDLE -> START_DETECT -> D0 -> ... -> D7 -> PARITY -> STOP0 -> STOP1 -> IDLE
//! ```
//!
//! The receiver is paced by the oversampled sample tick, not the baud tick.
//! With `N` sample ticks per bit (16 unless the divisor is smaller):
//!
//! - IDLE watches for a falling edge on the line at each sample tick;
//! - START_DETECT waits `N / 2` ticks and re-samples, which puts it in the
//!   middle of the start bit. A high level there is a glitch and the machine
//!   drops back to IDLE. With a single tick per bit there is no middle to
//!   wait for, so the edge sample itself counts as the start bit and IDLE
//!   goes straight to D0;
//! - every later state waits `N` ticks, landing on the middle of its bit.
//!
//! Parity and framing errors never stall the machine. It always finishes
//! STOP1 and returns to IDLE; a frame with any error is reported through
//! [`RxEvent::Rejected`] and its byte is not delivered.

use crate::frame::parity_bit;
use crate::shift::ShiftRegister;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};

/// RX states in frame order. The discriminants match the RTL encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RxState {
    #[default]
    Idle = 0,
    StartDetect,
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

impl RxState {
    const ALL: [Self; 13] = [
        Self::Idle,
        Self::StartDetect,
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
        "RX_IDLE",
        "RX_START_DETECT",
        "RX_D0",
        "RX_D1",
        "RX_D2",
        "RX_D3",
        "RX_D4",
        "RX_D5",
        "RX_D6",
        "RX_D7",
        "RX_PARITY",
        "RX_STOP0",
        "RX_STOP1",
    ];

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

    const fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for RxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame-level outcome reported on the cycle it is decided
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxEvent {
    /// Clean frame; the byte goes to the RX FIFO
    Received(u8),
    /// Frame completed with a parity and/or framing error; the byte is dropped
    Rejected { byte: u8, parity: bool, framing: bool },
    /// Start edge did not survive to mid-bit
    GlitchRejected,
}

#[derive(Clone, Debug)]
pub struct RxMachine {
    state: RxState,
    shift: ShiftRegister,
    /// Sample ticks seen since entering the current state
    ticks: u32,
    /// Line level at the previous sample tick, for edge detection
    last_line: bool,
    parity_error: bool,
    framing_error: bool,
}

impl Default for RxMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RxMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RxState::Idle,
            shift: ShiftRegister::new(),
            ticks: 0,
            last_line: true,
            parity_error: false,
            framing_error: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn state(&self) -> RxState {
        self.state
    }

    #[must_use]
    pub const fn shift_register(&self) -> &ShiftRegister {
        &self.shift
    }

    /// Counts one sample tick; true once `period` ticks have passed in this state
    fn elapsed(&mut self, period: u32) -> bool {
        self.ticks += 1;
        if self.ticks >= period {
            self.ticks = 0;
            true
        } else {
            false
        }
    }

    fn begin_frame(&mut self) {
        self.shift.clear();
        self.parity_error = false;
        self.framing_error = false;
        self.enter(RxState::D0);
    }

    fn enter(&mut self, next: RxState) {
        if next != self.state {
            trace!(from = %self.state, to = %next, "rx transition");
        }
        self.state = next;
        self.ticks = 0;
    }

    /// Advances one clock cycle.
    ///
    /// `samples_per_bit` comes from the baud generator; nothing happens
    /// while it is zero (no divisor latched).
    pub fn step(&mut self, sample_tick: bool, line: bool, samples_per_bit: u32) -> Option<RxEvent> {
        if !sample_tick || samples_per_bit == 0 {
            return None;
        }
        let previous = std::mem::replace(&mut self.last_line, line);
        let half = samples_per_bit / 2;

        match self.state {
            RxState::Idle => {
                if previous && !line {
                    if half == 0 {
                        self.begin_frame();
                    } else {
                        self.enter(RxState::StartDetect);
                    }
                }
                None
            }
            RxState::StartDetect => {
                if !self.elapsed(half) {
                    return None;
                }
                if line {
                    debug!("rx start glitch rejected");
                    self.enter(RxState::Idle);
                    return Some(RxEvent::GlitchRejected);
                }
                self.begin_frame();
                None
            }
            RxState::Parity => {
                if !self.elapsed(samples_per_bit) {
                    return None;
                }
                if line != parity_bit(self.shift.value()) {
                    warn!(byte = self.shift.value(), "rx parity error");
                    self.parity_error = true;
                }
                self.enter(RxState::Stop0);
                None
            }
            RxState::Stop0 => {
                if !self.elapsed(samples_per_bit) {
                    return None;
                }
                if !line {
                    warn!("rx framing error in first stop bit");
                    self.framing_error = true;
                }
                self.enter(RxState::Stop1);
                None
            }
            RxState::Stop1 => {
                if !self.elapsed(samples_per_bit) {
                    return None;
                }
                if !line {
                    warn!("rx framing error in second stop bit");
                    self.framing_error = true;
                }
                self.enter(RxState::Idle);
                Some(self.finish())
            }
            data => {
                if !self.elapsed(samples_per_bit) {
                    return None;
                }
                self.shift.shift_in(line);
                self.enter(data.next());
                None
            }
        }
    }

    fn finish(&self) -> RxEvent {
        let byte = self.shift.value();
        if self.parity_error || self.framing_error {
            RxEvent::Rejected {
                byte,
                parity: self.parity_error,
                framing: self.framing_error,
            }
        } else {
            debug!("rx frame complete {byte:#010b}");
            RxEvent::Received(byte)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, StopSlot};

    const SPB: u32 = 16;

    /// Holds each level for a full bit period of sample ticks
    fn drive(rx: &mut RxMachine, levels: impl IntoIterator<Item = bool>) -> Vec<RxEvent> {
        drive_at(rx, SPB, levels)
    }

    fn drive_at(
        rx: &mut RxMachine,
        samples_per_bit: u32,
        levels: impl IntoIterator<Item = bool>,
    ) -> Vec<RxEvent> {
        let mut events = Vec::new();
        for level in levels {
            for _ in 0..samples_per_bit {
                events.extend(rx.step(true, level, samples_per_bit));
            }
        }
        events
    }

    fn idle(bits: usize) -> impl Iterator<Item = bool> {
        std::iter::repeat(true).take(bits)
    }

    #[test]
    fn test_rx_receives_frame() {
        let mut rx = RxMachine::new();
        let frame = Frame::new(0b1100_1011);
        let events = drive(&mut rx, idle(2).chain(frame.bits()).chain(idle(1)));
        assert_eq!(events, [RxEvent::Received(0b1100_1011)]);
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn test_rx_few_samples_per_bit() {
        for spb in [1, 2, 3, 5] {
            let mut rx = RxMachine::new();
            let a = Frame::new(0b1100_1011);
            let b = Frame::new(0x5A);
            let levels = idle(2).chain(a.bits()).chain(idle(1)).chain(b.bits()).chain(idle(1));
            let events = drive_at(&mut rx, spb, levels);
            assert_eq!(
                events,
                [RxEvent::Received(0b1100_1011), RxEvent::Received(0x5A)],
                "{spb} samples per bit"
            );
            assert_eq!(rx.state(), RxState::Idle);
        }
    }

    #[test]
    fn test_rx_single_sample_skips_start_detect() {
        let mut rx = RxMachine::new();
        assert_eq!(rx.step(true, true, 1), None);
        assert_eq!(rx.step(true, false, 1), None);
        assert_eq!(rx.state(), RxState::D0);
        assert_eq!(rx.shift_register().cursor(), 0);
    }

    #[test]
    fn test_rx_back_to_back_frames() {
        let mut rx = RxMachine::new();
        let a = Frame::new(0x00);
        let b = Frame::new(0xFF);
        let events = drive(&mut rx, idle(1).chain(a.bits()).chain(b.bits()).chain(idle(1)));
        assert_eq!(events, [RxEvent::Received(0x00), RxEvent::Received(0xFF)]);
    }

    #[test]
    fn test_rx_ignores_non_tick_cycles() {
        let mut rx = RxMachine::new();
        for _ in 0..100 {
            assert_eq!(rx.step(false, false, SPB), None);
        }
        assert_eq!(rx.state(), RxState::Idle);
        // Nothing happens without a latched divisor either
        assert_eq!(rx.step(true, false, 0), None);
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn test_rx_rejects_glitch() {
        let mut rx = RxMachine::new();
        let mut events = Vec::new();
        events.extend(rx.step(true, false, SPB));
        assert_eq!(rx.state(), RxState::StartDetect);
        for _ in 0..SPB * 4 {
            events.extend(rx.step(true, true, SPB));
        }
        assert_eq!(events, [RxEvent::GlitchRejected]);
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn test_rx_parity_error_completes_frame() {
        let mut rx = RxMachine::new();
        let frame = Frame::new(0x5A).with_bad_parity();
        let events = drive(&mut rx, idle(1).chain(frame.bits()).chain(idle(1)));
        assert_eq!(
            events,
            [RxEvent::Rejected { byte: 0x5A, parity: true, framing: false }]
        );
        assert_eq!(rx.state(), RxState::Idle);

        // The next clean frame is not affected
        let events = drive(&mut rx, Frame::new(0x11).bits());
        assert_eq!(events, [RxEvent::Received(0x11)]);
    }

    #[test]
    fn test_rx_framing_error() {
        for slot in [StopSlot::First, StopSlot::Second] {
            let mut rx = RxMachine::new();
            let frame = Frame::new(0x3C).with_bad_stop(slot);
            let events = drive(&mut rx, idle(1).chain(frame.bits()).chain(idle(1)));
            assert_eq!(
                events,
                [RxEvent::Rejected { byte: 0x3C, parity: false, framing: true }],
                "{slot:?} stop bit"
            );
            assert_eq!(rx.state(), RxState::Idle);
        }
    }

    #[test]
    fn test_rx_break_does_not_retrigger() {
        // Line held low: one rejected frame, then nothing until it rises again
        let mut rx = RxMachine::new();
        let events = drive(&mut rx, idle(1).chain(std::iter::repeat(false).take(40)));
        assert_eq!(
            events,
            [RxEvent::Rejected { byte: 0x00, parity: false, framing: true }]
        );
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn test_rx_state_names() {
        assert_eq!(RxState::StartDetect.to_string(), "RX_START_DETECT");
        assert_eq!(RxState::from_encoding(12), Some(RxState::Stop1));
        assert_eq!(RxState::Stop1.encoding(), 12);
    }
}
