// Positional servo: angle -> pulse width -> duty count.

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use super::config::ServoConfig;
use crate::error::{Error, PinResultExt};

pub struct Servo<P> {
    pwm: P,
    config: ServoConfig,
    angle: Option<f32>,
}

impl<P: SetDutyCycle> Servo<P> {
    /// The PWM output must already run at `config.frequency_hz`.
    pub fn new(pwm: P, config: ServoConfig) -> Result<Self, Error> {
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(Self {
            pwm,
            config,
            angle: None,
        })
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    pub fn rotate_to(&mut self, angle: f32) -> Result<(), Error> {
        let pulse = self
            .config
            .pulse_for_angle(angle)
            .ok_or(Error::InvalidConfig("angle outside servo range"))?;
        self.write_pulse(pulse)?;
        debug!("servo -> {} deg ({} us)", angle, pulse);
        self.angle = Some(angle);
        Ok(())
    }

    /// Raw pulse, limited to the configured pulse range.
    pub fn set_pulse_us(&mut self, pulse_us: u32) -> Result<(), Error> {
        if pulse_us < self.config.min_pulse_us || pulse_us > self.config.max_pulse_us {
            return Err(Error::InvalidConfig("pulse outside servo range"));
        }
        self.write_pulse(pulse_us)?;
        self.angle = None;
        Ok(())
    }

    fn write_pulse(&mut self, pulse_us: u32) -> Result<(), Error> {
        let duty = self
            .config
            .duty_for_pulse(pulse_us, self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty).pin_err()?;
        Ok(())
    }

    /// Last commanded angle; `None` before the first move or after `disable`.
    pub fn angle(&self) -> Option<f32> {
        self.angle
    }

    /// Stop pulsing; the servo stops holding position.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.pwm.set_duty_cycle_fully_off().pin_err()?;
        self.angle = None;
        Ok(())
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use embedded_hal_bus::i2c::RefCellDevice;

    use super::*;
    use crate::drivers::pwm::{Pca9685, Pca9685Channel};
    use crate::drivers::sensor::Mcp9808;
    use crate::testing::{I2cOp, I2cScript, MockPwm};

    #[test]
    fn angle_maps_to_duty() {
        let pwm = MockPwm::new(20_000);
        let mut s = Servo::new(pwm.clone(), ServoConfig::SG90).unwrap();
        assert_eq!(s.angle(), None);
        s.rotate_to(0.0).unwrap();
        assert_eq!(pwm.duty(), 500);
        s.rotate_to(180.0).unwrap();
        assert_eq!(pwm.duty(), 2400);
        s.rotate_to(90.0).unwrap();
        assert_eq!(pwm.duty(), 1450);
        assert_eq!(s.angle(), Some(90.0));
    }

    #[test]
    fn out_of_range_keeps_last_position() {
        let pwm = MockPwm::new(20_000);
        let mut s = Servo::new(pwm.clone(), ServoConfig::STANDARD).unwrap();
        s.rotate_to(45.0).unwrap();
        assert!(matches!(s.rotate_to(200.0), Err(Error::InvalidConfig(_))));
        assert!(s.rotate_to(-1.0).is_err());
        assert_eq!(s.angle(), Some(45.0));
        assert_eq!(pwm.duty(), 1250);
        assert!(s.set_pulse_us(2500).is_err());
        s.disable().unwrap();
        assert_eq!(pwm.duty(), 0);
        assert_eq!(s.angle(), None);
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = ServoConfig::new(0.0, 180.0, 2500, 500, 50);
        assert!(Servo::new(MockPwm::new(100), cfg).is_err());
    }

    #[test]
    fn runs_on_pca9685_sharing_the_bus() {
        let script = I2cScript::new([
            // 1.5 ms at 50 Hz = 307 counts on channel 2 (0x0E)
            I2cOp::write(0x40, &[0x0E, 0x00, 0x00, 0x33, 0x01]),
            I2cOp::write_read(0x18, &[0x05], &[0x01, 0x90]),
        ]);
        let bus = RefCell::new(script.clone());
        let pca = RefCell::new(Pca9685::new(RefCellDevice::new(&bus), 0x40).unwrap());
        let mut thermo = Mcp9808::new(RefCellDevice::new(&bus), 0x18).unwrap();

        let mut servo = Servo::new(Pca9685Channel::new(&pca, 2).unwrap(), ServoConfig::STANDARD).unwrap();
        servo.rotate_to(90.0).unwrap();
        assert_eq!(thermo.read_celsius().unwrap(), 25.0);
        script.done();
    }
}
