// PWM controllers. Channel handles implement embedded-hal's
// SetDutyCycle so servos and motors can run on them directly.

pub mod pca9685;

pub use pca9685::{Pca9685, Pca9685Channel};
