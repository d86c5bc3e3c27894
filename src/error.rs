//! Error types for configuration and the simulation bench.
//!
//! Line-level conditions (parity, framing, overflow) are not errors in this
//! sense: they are sampled status flags on [`UartOutputs`]. The types here
//! cover the things a caller can get wrong before a single cycle runs, and
//! the bench giving up on a handshake.
//!
//! [`UartOutputs`]: crate::uart::UartOutputs

use thiserror::Error;

/// Rejected configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A baud divisor of zero would never produce a tick
    #[error("baud divisor must be at least 1")]
    ZeroDivisor,
    /// FIFO depth must be a non-zero power of two
    #[error("FIFO depth {0} is not a non-zero power of two")]
    FifoDepth(usize),
    /// Reset was configured shorter than the controller needs
    #[error("reset must be held for at least {min} cycles, got {cycles}")]
    ResetTooShort { cycles: u32, min: u32 },
    /// Configuration file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file is not valid JSON for [`UartConfig`]
    ///
    /// [`UartConfig`]: crate::config::UartConfig
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while driving the controller from the bench
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// `o_enq_tx_ready` stayed low for the whole wait window
    #[error("TX FIFO not ready after {cycles} cycles")]
    EnqueueTimeout { cycles: u64 },
    /// The bench hit its cycle limit
    #[error("cycle limit of {limit} reached")]
    CycleLimit { limit: u64 },
}
