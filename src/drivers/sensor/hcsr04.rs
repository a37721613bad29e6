// HC-SR04 ultrasonic ranger (trigger/echo GPIO)
//
// 10 us trigger pulse, then ECHO stays high for the round-trip time of
// the ping. Echo width is measured by polling in fixed steps, so the
// resolution is step_us * 0.17 mm. No echo past ~4 m: the module holds
// ECHO high for its own timeout and the reading is reported as None.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use crate::error::{Error, PinResultExt};
use crate::sampling::Sensor;

pub const DEFAULT_STEP_US: u32 = 10;

// echo must start within this after the trigger
const ECHO_START_BUDGET_US: u32 = 30_000;
// ~4.3 m round trip
const MAX_ECHO_US: u32 = 25_000;

pub struct HcSr04<TRIG, ECHO, D> {
    trig: TRIG,
    echo: ECHO,
    delay: D,
    step_us: u32,
    last: Option<u32>,
}

impl<TRIG, ECHO, D> HcSr04<TRIG, ECHO, D>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    D: DelayNs,
{
    pub fn new(trig: TRIG, echo: ECHO, delay: D) -> Self {
        Self {
            trig,
            echo,
            delay,
            step_us: DEFAULT_STEP_US,
            last: None,
        }
    }

    pub fn set_step_us(&mut self, step_us: u32) -> Result<(), Error> {
        if step_us == 0 || step_us > 1_000 {
            return Err(Error::InvalidConfig("echo step must be 1..=1000 us"));
        }
        self.step_us = step_us;
        Ok(())
    }

    fn trigger(&mut self) -> Result<(), Error> {
        self.trig.set_low().pin_err()?;
        self.delay.delay_us(2);
        self.trig.set_high().pin_err()?;
        self.delay.delay_us(10);
        self.trig.set_low().pin_err()?;
        Ok(())
    }

    /// Echo high time in microseconds, `None` when nothing is in range.
    pub fn echo_us(&mut self) -> Result<Option<u32>, Error> {
        self.trigger()?;

        let mut waited = 0;
        while !self.echo.is_high().pin_err()? {
            if waited >= ECHO_START_BUDGET_US {
                warn!("HC-SR04: no echo pulse");
                return Err(Error::Timeout);
            }
            self.delay.delay_us(self.step_us);
            waited += self.step_us;
        }

        let mut width = 0;
        loop {
            self.delay.delay_us(self.step_us);
            width += self.step_us;
            if !self.echo.is_high().pin_err()? {
                return Ok(Some(width));
            }
            if width >= MAX_ECHO_US {
                return Ok(None);
            }
        }
    }

    pub fn measure_mm(&mut self) -> Result<Option<u32>, Error> {
        let mm = self.echo_us()?.map(echo_to_mm);
        debug!("HC-SR04 {:?} mm", mm);
        self.last = mm;
        Ok(mm)
    }

    pub fn last_mm(&self) -> Option<u32> {
        self.last
    }

    pub fn release(self) -> (TRIG, ECHO, D) {
        (self.trig, self.echo, self.delay)
    }
}

/// Round trip at 343 m/s.
pub fn echo_to_mm(echo_us: u32) -> u32 {
    // u32::MAX * 343 / 2000 still fits u32
    (echo_us as u64 * 343 / 2000) as u32
}

impl<TRIG, ECHO, D> Sensor for HcSr04<TRIG, ECHO, D>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    D: DelayNs,
{
    type Reading = Option<u32>;
    type Error = Error;

    fn read(&mut self) -> Result<Option<u32>, Error> {
        self.measure_mm()
    }
}
