//! Serial frame layout
//!
//! ```text
//!  idle | start | D0 D1 D2 D3 D4 D5 D6 D7 | parity | stop0 stop1 | idle
//!   1   |   0   |   data, LSB first        |  even  |   1     1   |  1
//! ```
//!
//! Word length and parity mode are fixed. The parity bit makes the number of
//! ones across data and parity even.

use serde::{Deserialize, Serialize};

/// Data bits per frame
pub const DATA_BITS: u8 = 8;

/// Bit periods per frame: start, data, parity and two stop bits
pub const FRAME_BITS: u32 = 1 + DATA_BITS as u32 + 1 + 2;

/// Parity bit for `byte` under the fixed even polarity
#[must_use]
pub const fn parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 1
}

/// Which of the two stop bits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopSlot {
    First,
    Second,
}

/// One frame on the wire.
///
/// TX and RX never hold one of these; they build and rebuild a frame bit by
/// bit. The type exists so stimulus can describe what to put on a line,
/// including frames that are deliberately wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub data: u8,
    pub parity: bool,
    pub stop: [bool; 2],
}

impl Frame {
    /// A well-formed frame carrying `data`
    #[must_use]
    pub const fn new(data: u8) -> Self {
        Self {
            data,
            parity: parity_bit(data),
            stop: [true, true],
        }
    }

    /// Same data with the parity bit inverted
    #[must_use]
    pub const fn with_bad_parity(mut self) -> Self {
        self.parity = !self.parity;
        self
    }

    /// Same data with the given stop bit driven low
    #[must_use]
    pub const fn with_bad_stop(mut self, slot: StopSlot) -> Self {
        match slot {
            StopSlot::First => self.stop[0] = false,
            StopSlot::Second => self.stop[1] = false,
        }
        self
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.parity == parity_bit(self.data) && self.stop[0] && self.stop[1]
    }

    /// Line levels in transmission order
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        let data = (0..DATA_BITS).map(move |i| (self.data >> i) & 1 == 1);
        std::iter::once(false)
            .chain(data)
            .chain(std::iter::once(self.parity))
            .chain(self.stop.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_is_even() {
        assert!(!parity_bit(0x00));
        assert!(parity_bit(0x01));
        assert!(!parity_bit(0x03));
        // 0b11001011 has five ones
        assert!(parity_bit(0b1100_1011));
    }

    #[test]
    fn test_frame_bits_order() {
        let bits: Vec<bool> = Frame::new(0b1100_1011).bits().collect();
        assert_eq!(bits.len(), FRAME_BITS as usize);
        assert_eq!(
            bits,
            vec![
                false, // start
                true, true, false, true, false, false, true, true, // LSB first
                true, // parity
                true, true, // stop
            ]
        );
    }

    #[test]
    fn test_crafted_frames() {
        let good = Frame::new(0x5A);
        assert!(good.is_valid());
        assert!(!good.with_bad_parity().is_valid());
        assert!(!good.with_bad_stop(StopSlot::Second).is_valid());
        assert_eq!(good.with_bad_stop(StopSlot::First).bits().nth(10), Some(false));
        assert_eq!(good.with_bad_stop(StopSlot::Second).bits().nth(10), Some(true));
        assert_eq!(good.with_bad_stop(StopSlot::Second).bits().nth(11), Some(false));
    }
}
