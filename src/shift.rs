//! 8-bit shift register with a bit cursor, shared by TX and RX.

use crate::frame::DATA_BITS;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftRegister {
    value: u8,
    cursor: u8,
}

impl ShiftRegister {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: 0,
            cursor: 0,
        }
    }

    /// Loads a whole byte and rewinds the cursor (TX side)
    pub const fn load(&mut self, byte: u8) {
        self.value = byte;
        self.cursor = 0;
    }

    /// Empties the register and rewinds the cursor (RX side)
    pub const fn clear(&mut self) {
        self.value = 0;
        self.cursor = 0;
    }

    /// Bit under the cursor, LSB first. Reads 1 (mark) once all bits are out.
    #[must_use]
    pub const fn current(&self) -> bool {
        if self.cursor >= DATA_BITS {
            return true;
        }
        (self.value >> self.cursor) & 1 == 1
    }

    /// Returns the bit under the cursor and moves past it
    pub const fn shift_out(&mut self) -> bool {
        let bit = self.current();
        if self.cursor < DATA_BITS {
            self.cursor += 1;
        }
        bit
    }

    /// Stores `bit` at the cursor and moves past it. Extra bits are ignored.
    pub const fn shift_in(&mut self, bit: bool) {
        if self.cursor >= DATA_BITS {
            return;
        }
        if bit {
            self.value |= 1 << self.cursor;
        } else {
            self.value &= !(1 << self.cursor);
        }
        self.cursor += 1;
    }

    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    #[must_use]
    pub const fn cursor(&self) -> u8 {
        self.cursor
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.cursor >= DATA_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_out_lsb_first() {
        let mut reg = ShiftRegister::new();
        reg.load(0b1100_1011);
        let bits: Vec<bool> = (0..8).map(|_| reg.shift_out()).collect();
        assert_eq!(bits, [true, true, false, true, false, false, true, true]);
        assert!(reg.is_complete());
        // Past the end the line idles high
        assert!(reg.shift_out());
    }

    #[test]
    fn test_shift_in_rebuilds_byte() {
        let mut reg = ShiftRegister::new();
        for bit in [true, true, false, true, false, false, true, true] {
            reg.shift_in(bit);
        }
        assert_eq!(reg.value(), 0b1100_1011);
        assert_eq!(reg.cursor(), 8);

        reg.shift_in(false);
        assert_eq!(reg.value(), 0b1100_1011);

        reg.clear();
        assert_eq!(reg.value(), 0);
        assert_eq!(reg.cursor(), 0);
    }
}
