// Reading caches and polling helpers shared by the sensor drivers.
//
// Sensors expose a blocking read(); callers decide when to poll
// (PollSchedule) and whether a reading is worth reporting (Sampler).
// Values written from interrupt handlers live in a Shared cell.

pub mod poll;
pub mod sampler;
pub mod shared;

pub use poll::PollSchedule;
pub use sampler::{ChangeResult, Delta, Sampler};
pub use shared::Shared;

/// A driver that produces one reading per call.
pub trait Sensor {
    type Reading;
    type Error;

    fn read(&mut self) -> Result<Self::Reading, Self::Error>;
}
