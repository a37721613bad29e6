// H-bridge DC motor (L298N / TB6612 style)
//
// IN1/IN2 pick the direction, PWM on the enable pin sets speed.
//   IN1 IN2
//    1   0   forward (clockwise)
//    0   1   reverse
//    0   0   coast (outputs floating)
//    1   1   brake (both terminals shorted)

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use super::Direction;
use crate::error::{Error, PinResultExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    #[default]
    Coast,
    Brake,
}

pub struct HBridgeMotor<EN, A, B> {
    enable: EN,
    in1: A,
    in2: B,
    calibration: f32,
    speed: f32,
}

impl<EN, A, B> HBridgeMotor<EN, A, B>
where
    EN: SetDutyCycle,
    A: OutputPin,
    B: OutputPin,
{
    /// Starts coasting.
    pub fn new(enable: EN, in1: A, in2: B) -> Result<Self, Error> {
        let mut motor = Self {
            enable,
            in1,
            in2,
            calibration: 1.0,
            speed: 0.0,
        };
        motor.stop(StopMode::Coast)?;
        Ok(motor)
    }

    /// Scale applied to every speed, for matching two motors.
    pub fn set_calibration(&mut self, factor: f32) -> Result<(), Error> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(Error::InvalidConfig("calibration must be in (0.0, 1.0]"));
        }
        self.calibration = factor;
        Ok(())
    }

    /// -1.0 full reverse ..= 1.0 full forward; 0.0 coasts.
    pub fn set_speed(&mut self, speed: f32) -> Result<(), Error> {
        if !(-1.0..=1.0).contains(&speed) {
            return Err(Error::InvalidConfig("speed must be -1.0..=1.0"));
        }
        if speed == 0.0 {
            return self.stop(StopMode::Coast);
        }

        if speed > 0.0 {
            self.in2.set_low().pin_err()?;
            self.in1.set_high().pin_err()?;
        } else {
            self.in1.set_low().pin_err()?;
            self.in2.set_high().pin_err()?;
        }
        let max = self.enable.max_duty_cycle();
        let duty = (speed.abs() * self.calibration * max as f32 + 0.5) as u16;
        self.enable.set_duty_cycle(duty.min(max)).pin_err()?;
        debug!("motor speed {} (duty {}/{})", speed, duty, max);
        self.speed = speed;
        Ok(())
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self) -> Option<Direction> {
        if self.speed > 0.0 {
            Some(Direction::Clockwise)
        } else if self.speed < 0.0 {
            Some(Direction::CounterClockwise)
        } else {
            None
        }
    }

    pub fn stop(&mut self, mode: StopMode) -> Result<(), Error> {
        match mode {
            StopMode::Coast => {
                self.in1.set_low().pin_err()?;
                self.in2.set_low().pin_err()?;
                self.enable.set_duty_cycle_fully_off().pin_err()?;
            }
            StopMode::Brake => {
                self.in1.set_high().pin_err()?;
                self.in2.set_high().pin_err()?;
                self.enable.set_duty_cycle_fully_on().pin_err()?;
            }
        }
        self.speed = 0.0;
        Ok(())
    }

    pub fn release(self) -> (EN, A, B) {
        (self.enable, self.in1, self.in2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPin, MockPwm, Wire};

    fn motor() -> (MockPwm, MockPin, MockPin, HBridgeMotor<MockPwm, MockPin, MockPin>) {
        let wire = Wire::new();
        let (a, b) = (wire.pin("in1"), wire.pin("in2"));
        let pwm = MockPwm::new(1000);
        let m = HBridgeMotor::new(pwm.clone(), a.clone(), b.clone()).unwrap();
        (pwm, a, b, m)
    }

    #[test]
    fn forward_reverse_duty() {
        let (pwm, a, b, mut m) = motor();
        m.set_speed(0.75).unwrap();
        assert!(a.driven() && !b.driven());
        assert_eq!(pwm.duty(), 750);
        assert_eq!(m.direction(), Some(Direction::Clockwise));

        m.set_speed(-1.0).unwrap();
        assert!(!a.driven() && b.driven());
        assert_eq!(pwm.duty(), 1000);
        assert_eq!(m.direction(), Some(Direction::CounterClockwise));
    }

    #[test]
    fn calibration_scales_duty() {
        let (pwm, _, _, mut m) = motor();
        m.set_calibration(0.9).unwrap();
        m.set_speed(0.5).unwrap();
        assert_eq!(pwm.duty(), 450);
        assert!(m.set_calibration(0.0).is_err());
        assert!(m.set_calibration(1.2).is_err());
    }

    #[test]
    fn stop_modes() {
        let (pwm, a, b, mut m) = motor();
        m.set_speed(0.5).unwrap();
        m.stop(StopMode::Brake).unwrap();
        assert!(a.driven() && b.driven());
        assert_eq!(pwm.duty(), 1000);
        assert_eq!(m.speed(), 0.0);

        m.set_speed(0.0).unwrap();
        assert!(!a.driven() && !b.driven());
        assert_eq!(pwm.duty(), 0);
        assert_eq!(m.direction(), None);
        assert!(m.set_speed(1.01).is_err());
        assert!(m.set_speed(f32::NAN).is_err());
    }
}
