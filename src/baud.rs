//! Baud and sample tick generation
//!
//! Divides the system clock into two single-cycle pulses:
//!
//! - the **baud tick**, once every `D` cycles, paces the transmitter;
//! - the **sample tick**, `min(16, D)` times per baud period, paces the
//!   receiver.
//!
//! Sample ticks come from a fractional accumulator rather than a second
//! integer divider, so a divisor that is not a multiple of 16 still yields
//! exactly 16 evenly spread sample ticks per bit, the last of which lands on
//! the same cycle as the baud tick.
//!
//! ## Divisor loading
//!
//! `i_baud_div` is latched on the first cycle after reset where it is
//! non-zero, and then ignored until the next reset. Until a divisor is
//! latched both ticks stay low, which is also how a zero divisor behaves at
//! the signal level.

use crate::config::BaudConfig;
use tracing::debug;

/// Tick pulses for one clock cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ticks {
    pub baud: bool,
    pub sample: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BaudGenerator {
    /// Latched divisor, `None` until loaded after reset
    config: Option<BaudConfig>,
    /// Cycles since the last baud tick
    count: u32,
    /// Sample phase accumulator, always below the divisor
    phase: u64,
}

impl BaudGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous reset: clear counters and forget the divisor
    pub fn reset(&mut self) {
        self.config = None;
        self.count = 0;
        self.phase = 0;
    }

    /// Latched divisor, if any
    #[must_use]
    pub const fn config(&self) -> Option<BaudConfig> {
        self.config
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.config.is_some()
    }

    /// Sample ticks per baud period, or 0 while unloaded
    #[must_use]
    pub fn samples_per_bit(&self) -> u32 {
        self.config.map_or(0, BaudConfig::samples_per_bit)
    }

    /// Advances one clock cycle.
    ///
    /// `rst_n` is the active-low synchronous reset and `baud_div` the raw
    /// divisor input.
    pub fn step(&mut self, rst_n: bool, baud_div: u32) -> Ticks {
        if !rst_n {
            self.reset();
            return Ticks::default();
        }

        let Some(config) = self.config else {
            // The loading cycle itself produces no tick
            if let Ok(config) = BaudConfig::new(baud_div) {
                debug!(divisor = config.divisor(), "baud divisor latched");
                self.config = Some(config);
            }
            return Ticks::default();
        };

        let divisor = config.divisor();

        self.count += 1;
        let baud = self.count == divisor;
        if baud {
            self.count = 0;
        }

        self.phase += u64::from(config.samples_per_bit());
        let sample = self.phase >= u64::from(divisor);
        if sample {
            self.phase -= u64::from(divisor);
        }

        Ticks { baud, sample }
    }
}
