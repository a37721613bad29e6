// Continuous-rotation servo: pulse width sets speed and direction
// around the neutral (stopped) pulse.

use embedded_hal::pwm::SetDutyCycle;

use super::config::ServoConfig;
use crate::drivers::motor::Direction;
use crate::error::{Error, PinResultExt};

pub struct ContinuousServo<P> {
    pwm: P,
    config: ServoConfig,
    neutral_us: u32,
}

impl<P: SetDutyCycle> ContinuousServo<P> {
    pub fn new(pwm: P, config: ServoConfig) -> Result<Self, Error> {
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(Self {
            pwm,
            config,
            neutral_us: config.neutral_pulse_us(),
        })
    }

    /// Shift the stop point for a servo that creeps at the nominal neutral.
    pub fn set_neutral_us(&mut self, neutral_us: u32) -> Result<(), Error> {
        if neutral_us <= self.config.min_pulse_us || neutral_us >= self.config.max_pulse_us {
            return Err(Error::InvalidConfig("neutral must be inside the pulse range"));
        }
        self.neutral_us = neutral_us;
        Ok(())
    }

    pub fn neutral_us(&self) -> u32 {
        self.neutral_us
    }

    /// Clockwise uses pulses above neutral.
    pub fn rotate(&mut self, direction: Direction, speed: f32) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&speed) {
            return Err(Error::InvalidConfig("speed must be 0.0..=1.0"));
        }
        let pulse = match direction {
            Direction::Clockwise => {
                let span = (self.config.max_pulse_us - self.neutral_us) as f32;
                self.neutral_us + (speed * span + 0.5) as u32
            }
            Direction::CounterClockwise => {
                let span = (self.neutral_us - self.config.min_pulse_us) as f32;
                self.neutral_us - (speed * span + 0.5) as u32
            }
        };
        self.write_pulse(pulse)
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        self.write_pulse(self.neutral_us)
    }

    pub fn disable(&mut self) -> Result<(), Error> {
        self.pwm.set_duty_cycle_fully_off().pin_err()?;
        Ok(())
    }

    fn write_pulse(&mut self, pulse_us: u32) -> Result<(), Error> {
        let duty = self
            .config
            .duty_for_pulse(pulse_us, self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty).pin_err()?;
        Ok(())
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPwm;

    #[test]
    fn speed_and_direction() {
        let pwm = MockPwm::new(20_000);
        let mut s = ContinuousServo::new(pwm.clone(), ServoConfig::STANDARD).unwrap();
        s.rotate(Direction::Clockwise, 1.0).unwrap();
        assert_eq!(pwm.duty(), 2000);
        s.rotate(Direction::CounterClockwise, 0.5).unwrap();
        assert_eq!(pwm.duty(), 1250);
        s.stop().unwrap();
        assert_eq!(pwm.duty(), 1500);
        s.disable().unwrap();
        assert_eq!(pwm.duty(), 0);
    }

    #[test]
    fn speed_bounds_and_trim() {
        let pwm = MockPwm::new(20_000);
        let mut s = ContinuousServo::new(pwm.clone(), ServoConfig::STANDARD).unwrap();
        assert!(s.rotate(Direction::Clockwise, 1.5).is_err());
        assert!(s.rotate(Direction::Clockwise, f32::NAN).is_err());
        s.set_neutral_us(1520).unwrap();
        s.stop().unwrap();
        assert_eq!(pwm.duty(), 1520);
        assert!(s.set_neutral_us(2000).is_err());
    }
}
