// Stepper motors
//
// StepDir: A4988 / DRV8825 style drivers. DIR is latched before the
// first STEP rising edge; each rising edge moves one (micro)step. The
// optional ENABLE input is active low.
//
// Uln2003: four coils driven directly (28BYJ-48). Half-step walks the
// 8-entry table, full-step the 4-entry two-coil table; bit 0 = IN1.
//
// Both take the delay per call so one timer can pace several motors.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::debug;

use super::Direction;
use crate::error::{Error, PinResultExt};

// DIR setup time before STEP
const DIR_SETUP_US: u32 = 1;

/// Placeholder for an enable pin that is hard-wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

fn steps_for_degrees(degrees: f32, steps_per_rev: u32) -> u32 {
    let steps = degrees.abs() / 360.0 * steps_per_rev as f32 + 0.5;
    steps as u32
}

fn degrees_direction(degrees: f32) -> Direction {
    if degrees < 0.0 {
        Direction::CounterClockwise
    } else {
        Direction::Clockwise
    }
}

pub struct StepDir<STEP, DIR, EN = NoPin> {
    step: STEP,
    dir: DIR,
    enable: EN,
    steps_per_rev: u32,
    pulse_us: u32,
    interval_us: u32,
    position: i64,
}

impl<STEP: OutputPin, DIR: OutputPin> StepDir<STEP, DIR, NoPin> {
    pub fn new(step: STEP, dir: DIR, steps_per_rev: u32) -> Result<Self, Error> {
        StepDir::with_enable(step, dir, NoPin, steps_per_rev)
    }
}

impl<STEP, DIR, EN> StepDir<STEP, DIR, EN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    /// Starts enabled.
    pub fn with_enable(
        mut step: STEP,
        dir: DIR,
        mut enable: EN,
        steps_per_rev: u32,
    ) -> Result<Self, Error> {
        if steps_per_rev == 0 {
            return Err(Error::InvalidConfig("steps per revolution must be non-zero"));
        }
        step.set_low().pin_err()?;
        enable.set_low().pin_err()?;
        Ok(Self {
            step,
            dir,
            enable,
            steps_per_rev,
            pulse_us: 2,
            interval_us: 1_000,
            position: 0,
        })
    }

    /// STEP high time and step period; the period must exceed the pulse.
    pub fn set_timing(&mut self, pulse_us: u32, interval_us: u32) -> Result<(), Error> {
        if pulse_us == 0 || interval_us <= pulse_us {
            return Err(Error::InvalidConfig("step interval must exceed pulse width"));
        }
        self.pulse_us = pulse_us;
        self.interval_us = interval_us;
        Ok(())
    }

    pub fn enable(&mut self) -> Result<(), Error> {
        self.enable.set_low().pin_err()?;
        Ok(())
    }

    /// Coils unpowered; the shaft turns freely.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.enable.set_high().pin_err()?;
        Ok(())
    }

    pub fn step(
        &mut self,
        steps: u32,
        direction: Direction,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error> {
        match direction {
            Direction::Clockwise => self.dir.set_high().pin_err()?,
            Direction::CounterClockwise => self.dir.set_low().pin_err()?,
        }
        delay.delay_us(DIR_SETUP_US);

        for _ in 0..steps {
            self.step.set_high().pin_err()?;
            delay.delay_us(self.pulse_us);
            self.step.set_low().pin_err()?;
            delay.delay_us(self.interval_us - self.pulse_us);
        }

        let signed = match direction {
            Direction::Clockwise => steps as i64,
            Direction::CounterClockwise => -(steps as i64),
        };
        self.position += signed;
        debug!("stepper {} steps {:?}, at {}", steps, direction, self.position);
        Ok(())
    }

    /// Negative angles turn counter-clockwise. Returns the steps taken.
    pub fn rotate_degrees(
        &mut self,
        degrees: f32,
        delay: &mut impl DelayNs,
    ) -> Result<u32, Error> {
        if !degrees.is_finite() {
            return Err(Error::InvalidConfig("angle must be finite"));
        }
        let steps = steps_for_degrees(degrees, self.steps_per_rev);
        self.step(steps, degrees_direction(degrees), delay)?;
        Ok(steps)
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn reset_position(&mut self) {
        self.position = 0;
    }

    pub fn release(self) -> (STEP, DIR, EN) {
        (self.step, self.dir, self.enable)
    }
}

const HALF_STEP: [u8; 8] = [0b0001, 0b0011, 0b0010, 0b0110, 0b0100, 0b1100, 0b1000, 0b1001];
const FULL_STEP: [u8; 4] = [0b0011, 0b0110, 0b1100, 0b1001];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    #[default]
    Half,
    Full,
}

impl StepMode {
    fn table(self) -> &'static [u8] {
        match self {
            StepMode::Half => &HALF_STEP,
            StepMode::Full => &FULL_STEP,
        }
    }

    /// 28BYJ-48 with its 1:64 gearbox.
    pub fn steps_per_rev(self) -> u32 {
        match self {
            StepMode::Half => 4096,
            StepMode::Full => 2048,
        }
    }
}

pub struct Uln2003<P> {
    coils: [P; 4],
    mode: StepMode,
    index: usize,
    interval_us: u32,
    position: i64,
}

impl<P: OutputPin> Uln2003<P> {
    /// Coils in IN1..IN4 order. Starts de-energized.
    pub fn new(coils: [P; 4], mode: StepMode) -> Result<Self, Error> {
        let mut m = Self {
            coils,
            mode,
            index: 0,
            interval_us: 2_000,
            position: 0,
        };
        m.release()?;
        Ok(m)
    }

    pub fn mode(&self) -> StepMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: StepMode) {
        self.index %= mode.table().len();
        self.mode = mode;
    }

    pub fn set_interval_us(&mut self, interval_us: u32) -> Result<(), Error> {
        if interval_us == 0 {
            return Err(Error::InvalidConfig("step interval must be non-zero"));
        }
        self.interval_us = interval_us;
        Ok(())
    }

    fn energize(&mut self, pattern: u8) -> Result<(), Error> {
        for (i, coil) in self.coils.iter_mut().enumerate() {
            coil.set_state((pattern >> i & 1 != 0).into()).pin_err()?;
        }
        Ok(())
    }

    pub fn step(
        &mut self,
        steps: u32,
        direction: Direction,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error> {
        let len = self.mode.table().len();
        for _ in 0..steps {
            self.index = match direction {
                Direction::Clockwise => (self.index + 1) % len,
                Direction::CounterClockwise => (self.index + len - 1) % len,
            };
            self.energize(self.mode.table()[self.index])?;
            delay.delay_us(self.interval_us);
            self.position += match direction {
                Direction::Clockwise => 1,
                Direction::CounterClockwise => -1,
            };
        }
        Ok(())
    }

    pub fn rotate_degrees(
        &mut self,
        degrees: f32,
        delay: &mut impl DelayNs,
    ) -> Result<u32, Error> {
        if !degrees.is_finite() {
            return Err(Error::InvalidConfig("angle must be finite"));
        }
        let steps = steps_for_degrees(degrees, self.mode.steps_per_rev());
        self.step(steps, degrees_direction(degrees), delay)?;
        Ok(steps)
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// De-energize all coils.
    pub fn release(&mut self) -> Result<(), Error> {
        self.energize(0)
    }

    pub fn free(self) -> [P; 4] {
        self.coils
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDelay, MockPin, Wire};

    fn coils(wire: &Wire) -> [MockPin; 4] {
        [wire.pin("in1"), wire.pin("in2"), wire.pin("in3"), wire.pin("in4")]
    }

    fn pattern(pins: &[MockPin; 4]) -> u8 {
        pins.iter()
            .enumerate()
            .fold(0, |acc, (i, p)| acc | (p.driven() as u8) << i)
    }

    #[test]
    fn step_dir_pulses_and_position() {
        let wire = Wire::new();
        let mut delay = MockDelay::new();
        let mut m = StepDir::new(wire.pin("step"), wire.pin("dir"), 200).unwrap();
        m.step(3, Direction::Clockwise, &mut delay).unwrap();
        assert_eq!(wire.rising_edges("step"), 3);
        assert_eq!(wire.levels("dir"), [true]);
        assert_eq!(delay.elapsed_us(), 1 + 3 * 1000);

        assert_eq!(m.rotate_degrees(-90.0, &mut delay).unwrap(), 50);
        assert_eq!(m.position(), -47);
        assert_eq!(wire.levels("dir"), [true, false]);
        assert!(m.set_timing(5, 5).is_err());
    }

    #[test]
    fn enable_is_active_low() {
        let wire = Wire::new();
        let en = wire.pin("en");
        let mut m = StepDir::with_enable(wire.pin("step"), wire.pin("dir"), en.clone(), 200).unwrap();
        assert!(!en.driven());
        m.disable().unwrap();
        assert!(en.driven());
        m.enable().unwrap();
        assert!(!en.driven());
        assert!(StepDir::new(wire.pin("s"), wire.pin("d"), 0).is_err());
    }

    #[test]
    fn uln2003_half_step_sequence() {
        let wire = Wire::new();
        let pins = coils(&wire);
        let mut m = Uln2003::new(pins.clone(), StepMode::Half).unwrap();
        let mut delay = MockDelay::new();
        let mut seen = std::vec::Vec::new();
        for _ in 0..8 {
            m.step(1, Direction::Clockwise, &mut delay).unwrap();
            seen.push(pattern(&pins));
        }
        assert_eq!(seen, [0b0011, 0b0010, 0b0110, 0b0100, 0b1100, 0b1000, 0b1001, 0b0001]);
        m.step(1, Direction::CounterClockwise, &mut delay).unwrap();
        assert_eq!(pattern(&pins), 0b1001);
        assert_eq!(m.position(), 7);

        m.release().unwrap();
        assert_eq!(pattern(&pins), 0);
    }

    #[test]
    fn uln2003_full_step_and_degrees() {
        let wire = Wire::new();
        let pins = coils(&wire);
        let mut m = Uln2003::new(pins.clone(), StepMode::Full).unwrap();
        let mut delay = MockDelay::new();
        assert_eq!(m.rotate_degrees(-360.0, &mut delay).unwrap(), 2048);
        // a whole number of cycles lands back on the starting pattern
        assert_eq!(pattern(&pins), FULL_STEP[0]);
        assert_eq!(m.position(), -2048);
        assert_eq!(delay.elapsed_us(), 2048 * 2000);
    }
}
