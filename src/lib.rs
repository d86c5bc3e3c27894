//! Cycle-accurate model of a UART controller.
//!
//! The controller serializes bytes from a TX FIFO into frames of one start
//! bit, eight data bits (LSB first), one even parity bit and two stop bits,
//! and rebuilds bytes from the serial input into an RX FIFO using a 16x
//! oversampled sample tick.
//!
//! ```text
//! producer -> TX FIFO -> TX FSM -> o_tx ~~~ i_rx -> RX FSM -> RX FIFO -> consumer
//!                          ^                          ^
//!                          +---- baud generator ------+
//! ```
//!
//! [`uart::UartController::step`] advances one clock edge. [`sim::Simulator`]
//! wraps it with reset sequencing, handshakes and loopback wiring.

// Core model
pub mod baud;
pub mod fifo;
pub mod frame;
pub mod rx;
pub mod shift;
pub mod tx;
pub mod uart;

// Configuration and bench
pub mod config;
pub mod error;
pub mod sim;

pub use config::{BaudConfig, UartConfig};
pub use error::{ConfigError, SimError};
pub use frame::Frame;
pub use sim::{RunResult, Simulator};
pub use uart::{UartController, UartInputs, UartOutputs, UartStatus};
