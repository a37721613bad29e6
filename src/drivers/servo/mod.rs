// Hobby servos on any SetDutyCycle output (MCU timer channel or a
// PCA9685 channel). Position is encoded as pulse width inside a fixed
// period, typically 1-2 ms every 20 ms.

pub mod config;
pub mod continuous;
pub mod positional;

pub use config::ServoConfig;
pub use continuous::ContinuousServo;
pub use positional::Servo;
