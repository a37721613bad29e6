// DC and stepper motor drivers.

pub mod hbridge;
pub mod stepper;

pub use hbridge::{HBridgeMotor, StopMode};
pub use stepper::{NoPin, StepDir, StepMode, Uln2003};

/// Rotation sense as seen facing the shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}
