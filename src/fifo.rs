//! Byte FIFO used for both the TX and RX buffers
//!
//! A circular buffer with explicit head/tail indices and an occupancy count,
//! the same shape as the RTL buffer. Capacity is a power of two so the
//! indices wrap with a mask.
//!
//! ## Per-cycle behaviour
//!
//! [`Fifo::clock`] models one rising edge: at most one push and one pop are
//! serviced, and both are judged against the flags *before* the edge. A push
//! into a full buffer or a pop from an empty one leaves the buffer untouched;
//! the requester sees the flag and retries on a later cycle.

use crate::error::ConfigError;
use tracing::trace;

/// Outcome of one clock edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FifoCycle {
    /// The pushed byte was stored
    pub accepted: bool,
    /// Byte removed from the head, if a pop was requested and honoured
    pub popped: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct Fifo {
    mem: Box<[u8]>,
    /// Next slot to read
    head: usize,
    /// Next slot to write
    tail: usize,
    count: usize,
}

impl Fifo {
    /// Creates an empty FIFO holding `capacity` bytes
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(ConfigError::FifoDepth(capacity));
        }
        Ok(Self {
            mem: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        })
    }

    fn mask(&self) -> usize {
        self.mem.len() - 1
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.mem.len()
    }

    /// Number of occupied entries
    #[must_use]
    pub const fn level(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn full(&self) -> bool {
        self.count == self.mem.len()
    }

    #[must_use]
    pub const fn empty(&self) -> bool {
        self.count == 0
    }

    /// Byte at the head without removing it
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        if self.empty() {
            None
        } else {
            Some(self.mem[self.head])
        }
    }

    /// Stores `byte` at the tail. Returns false (and changes nothing) when full.
    pub fn enqueue(&mut self, byte: u8) -> bool {
        if self.full() {
            return false;
        }
        self.mem[self.tail] = byte;
        self.tail = (self.tail + 1) & self.mask();
        self.count += 1;
        true
    }

    /// Removes the head byte, or returns `None` when empty
    pub fn dequeue(&mut self) -> Option<u8> {
        if self.empty() {
            return None;
        }
        let byte = self.mem[self.head];
        self.head = (self.head + 1) & self.mask();
        self.count -= 1;
        Some(byte)
    }

    /// One clock edge with an optional push and an optional pop.
    ///
    /// A full buffer still honours a pop and an empty one still honours a
    /// push, but the freed slot (or new entry) only becomes usable on the
    /// next edge.
    pub fn clock(&mut self, push: Option<u8>, pop: bool) -> FifoCycle {
        let was_full = self.full();
        let was_empty = self.empty();

        let popped = if pop && !was_empty { self.dequeue() } else { None };
        let accepted = match push {
            Some(byte) if !was_full => self.enqueue(byte),
            _ => false,
        };

        if accepted || popped.is_some() {
            trace!(level = self.count, accepted, ?popped, "fifo edge");
        }
        FifoCycle { accepted, popped }
    }

    /// Drops every entry (synchronous reset)
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_flags(fifo: &Fifo) {
        assert!(fifo.level() <= fifo.capacity());
        assert_eq!(fifo.full(), fifo.level() == fifo.capacity());
        assert_eq!(fifo.empty(), fifo.level() == 0);
    }

    #[test]
    fn test_fifo_rejects_bad_capacity() {
        assert!(matches!(Fifo::new(0), Err(ConfigError::FifoDepth(0))));
        assert!(matches!(Fifo::new(6), Err(ConfigError::FifoDepth(6))));
        assert_eq!(Fifo::new(1).unwrap().capacity(), 1);
    }

    #[test]
    fn test_fifo_order() {
        let mut fifo = Fifo::new(4).unwrap();
        assert!(fifo.enqueue(b'a'));
        assert!(fifo.enqueue(b'b'));
        assert_eq!(fifo.peek(), Some(b'a'));
        assert_eq!(fifo.dequeue(), Some(b'a'));
        assert!(fifo.enqueue(b'c'));
        assert_eq!(fifo.dequeue(), Some(b'b'));
        assert_eq!(fifo.dequeue(), Some(b'c'));
        assert_eq!(fifo.dequeue(), None);
        check_flags(&fifo);
    }

    #[test]
    fn test_fifo_full_keeps_contents() {
        let mut fifo = Fifo::new(4).unwrap();
        for byte in 0..4 {
            assert!(fifo.enqueue(byte));
        }
        assert!(fifo.full());
        assert!(!fifo.enqueue(0xFF));
        assert_eq!(fifo.level(), 4);
        let drained: Vec<u8> = std::iter::from_fn(|| fifo.dequeue()).collect();
        assert_eq!(drained, [0, 1, 2, 3]);
    }

    #[test]
    fn test_fifo_empty_dequeue_is_noop() {
        let mut fifo = Fifo::new(2).unwrap();
        assert_eq!(fifo.dequeue(), None);
        assert_eq!(fifo.dequeue(), None);
        assert_eq!(fifo.level(), 0);
        assert!(fifo.enqueue(7));
        assert_eq!(fifo.dequeue(), Some(7));
        check_flags(&fifo);
    }

    #[test]
    fn test_fifo_wraps_around() {
        let mut fifo = Fifo::new(2).unwrap();
        for byte in 0..10u8 {
            assert!(fifo.enqueue(byte));
            assert_eq!(fifo.dequeue(), Some(byte));
        }
        check_flags(&fifo);
    }

    #[test]
    fn test_fifo_clock_judges_prior_state() {
        let mut fifo = Fifo::new(2).unwrap();

        // Pop and push on empty: only the push lands
        let cycle = fifo.clock(Some(1), true);
        assert_eq!(cycle, FifoCycle { accepted: true, popped: None });
        fifo.clock(Some(2), false);
        assert!(fifo.full());

        // Pop and push on full: only the pop lands
        let cycle = fifo.clock(Some(3), true);
        assert_eq!(cycle, FifoCycle { accepted: false, popped: Some(1) });
        assert_eq!(fifo.level(), 1);
        assert_eq!(fifo.peek(), Some(2));

        // Both in the middle
        let cycle = fifo.clock(Some(3), true);
        assert_eq!(cycle, FifoCycle { accepted: true, popped: Some(2) });
        assert_eq!(fifo.peek(), Some(3));
        check_flags(&fifo);
    }

    #[test]
    fn test_fifo_level_stays_in_bounds() {
        // Fixed pseudo-random request pattern
        let mut fifo = Fifo::new(8).unwrap();
        let mut seed = 0x1234_5678u32;
        for _ in 0..1000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let push = (seed & 1 == 1).then_some(seed as u8);
            let pop = seed & 6 == 6;
            fifo.clock(push, pop);
            check_flags(&fifo);
        }
    }

    #[test]
    fn test_fifo_clear() {
        let mut fifo = Fifo::new(4).unwrap();
        fifo.enqueue(1);
        fifo.enqueue(2);
        fifo.clear();
        assert!(fifo.empty());
        assert_eq!(fifo.peek(), None);
    }
}
