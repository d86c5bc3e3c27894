//! Controller configuration
//!
//! The RTL takes its divisor on the `i_baud_div` input after reset; FIFO depth
//! is a synthesis parameter. Both live here together with the number of
//! cycles the bench holds reset, so a whole run can be described by one JSON
//! document:
//!
//! ```json
//! { "baud_div": 512, "fifo_depth": 16, "reset_cycles": 2 }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sample ticks per baud period when the divisor allows it
pub const OVERSAMPLE: u32 = 16;

/// Divisor used by the reference bench
pub const DEFAULT_BAUD_DIV: u32 = 512;

/// Default TX/RX FIFO depth
pub const DEFAULT_FIFO_DEPTH: usize = 16;

/// Shortest reset pulse the controller is specified for
pub const MIN_RESET_CYCLES: u32 = 2;

/// Clock cycles per bit period.
///
/// Always non-zero once constructed; a zero divisor is rejected here rather
/// than producing a generator that never ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaudConfig(u32);

impl BaudConfig {
    pub fn new(divisor: u32) -> Result<Self, ConfigError> {
        if divisor == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        Ok(Self(divisor))
    }

    #[must_use]
    pub const fn divisor(self) -> u32 {
        self.0
    }

    /// Effective oversampling ratio: one sample tick per clock at most
    #[must_use]
    pub const fn samples_per_bit(self) -> u32 {
        if self.0 < OVERSAMPLE {
            self.0
        } else {
            OVERSAMPLE
        }
    }

    /// Clock cycles taken by one full frame (start, 8 data, parity, 2 stop)
    #[must_use]
    pub const fn frame_cycles(self) -> u64 {
        crate::frame::FRAME_BITS as u64 * self.0 as u64
    }
}

impl Default for BaudConfig {
    fn default() -> Self {
        Self(DEFAULT_BAUD_DIV)
    }
}

impl TryFrom<u32> for BaudConfig {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BaudConfig> for u32 {
    fn from(config: BaudConfig) -> Self {
        config.0
    }
}

/// Full controller and bench configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UartConfig {
    pub baud_div: BaudConfig,
    pub fifo_depth: usize,
    pub reset_cycles: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_div: BaudConfig::default(),
            fifo_depth: DEFAULT_FIFO_DEPTH,
            reset_cycles: MIN_RESET_CYCLES,
        }
    }
}

impl UartConfig {
    /// Checks the values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fifo_depth == 0 || !self.fifo_depth.is_power_of_two() {
            return Err(ConfigError::FifoDepth(self.fifo_depth));
        }
        if self.reset_cycles < MIN_RESET_CYCLES {
            return Err(ConfigError::ResetTooShort {
                cycles: self.reset_cycles,
                min: MIN_RESET_CYCLES,
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_divisor_rejected() {
        assert!(matches!(BaudConfig::new(0), Err(ConfigError::ZeroDivisor)));
        assert_eq!(BaudConfig::new(1).unwrap().divisor(), 1);
    }

    #[test]
    fn test_samples_per_bit_clamps_to_divisor() {
        assert_eq!(BaudConfig::new(512).unwrap().samples_per_bit(), 16);
        assert_eq!(BaudConfig::new(16).unwrap().samples_per_bit(), 16);
        assert_eq!(BaudConfig::new(5).unwrap().samples_per_bit(), 5);
    }

    #[test]
    fn test_frame_cycles() {
        assert_eq!(BaudConfig::new(512).unwrap().frame_cycles(), 12 * 512);
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = UartConfig::from_json("{}").unwrap();
        assert_eq!(config, UartConfig::default());

        let config = UartConfig::from_json(r#"{ "baud_div": 64, "fifo_depth": 4 }"#).unwrap();
        assert_eq!(config.baud_div.divisor(), 64);
        assert_eq!(config.fifo_depth, 4);
        assert_eq!(config.reset_cycles, MIN_RESET_CYCLES);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            UartConfig::from_json(r#"{ "baud_div": 0 }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            UartConfig::from_json(r#"{ "fifo_depth": 12 }"#),
            Err(ConfigError::FifoDepth(12))
        ));
        assert!(matches!(
            UartConfig::from_json(r#"{ "reset_cycles": 1 }"#),
            Err(ConfigError::ResetTooShort { cycles: 1, min: 2 })
        ));
    }

    #[test]
    fn test_config_serializes_divisor_as_integer() {
        let json = serde_json::to_string(&UartConfig::default()).unwrap();
        assert!(json.contains("\"baud_div\":512"));
    }
}
