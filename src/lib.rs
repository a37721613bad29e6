// Peripheral drivers for small IoT boards (ADCs, digipots, IO expanders,
// displays, sensors, servos, motors) over embedded-hal 1.0.
//
// Each driver owns its bus or pins; nothing here knows about a specific
// board. Pin assignments and bus construction belong to the board crate.

#![cfg_attr(not(test), no_std)]

pub mod analog;
pub mod bus;
pub mod drivers;
pub mod error;
pub mod sampling;

#[cfg(test)]
mod testing;

pub use analog::AnalogInput;
pub use error::Error;
pub use sampling::{ChangeResult, PollSchedule, Sampler, Sensor, Shared};
