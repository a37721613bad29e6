// Linear analog temperature sensors (TMP35/36/37, LM35)
//
// Output voltage is offset + slope * degC, read through any
// AnalogInput (MCU ADC pin or an external ADC channel).

use log::debug;

use crate::analog::AnalogInput;
use crate::error::Error;
use crate::sampling::Sensor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Output at 0 degC.
    pub offset_mv: f32,
    pub mv_per_c: f32,
}

impl Calibration {
    pub const TMP35: Self = Self::new(0.0, 10.0);
    pub const TMP36: Self = Self::new(500.0, 10.0);
    pub const TMP37: Self = Self::new(0.0, 20.0);
    pub const LM35: Self = Self::new(0.0, 10.0);

    pub const fn new(offset_mv: f32, mv_per_c: f32) -> Self {
        Self {
            offset_mv,
            mv_per_c,
        }
    }

    pub fn celsius(&self, mv: u16) -> f32 {
        (mv as f32 - self.offset_mv) / self.mv_per_c
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::TMP36
    }
}

pub struct AnalogTemperature<A> {
    input: A,
    cal: Calibration,
    last: Option<f32>,
}

impl<A: AnalogInput> AnalogTemperature<A> {
    pub fn new(input: A, cal: Calibration) -> Result<Self, Error<A::Error>> {
        if cal.mv_per_c == 0.0 || !cal.mv_per_c.is_finite() {
            return Err(Error::InvalidConfig("sensor slope must be non-zero"));
        }
        Ok(Self {
            input,
            cal,
            last: None,
        })
    }

    pub fn calibration(&self) -> Calibration {
        self.cal
    }

    pub fn read_celsius(&mut self) -> Result<f32, Error<A::Error>> {
        let mv = nb::block!(self.input.read_mv()).map_err(Error::Bus)?;
        let c = self.cal.celsius(mv);
        debug!("analog temp {} mV -> {} C", mv, c);
        self.last = Some(c);
        Ok(c)
    }

    pub fn last_celsius(&self) -> Option<f32> {
        self.last
    }

    pub fn release(self) -> A {
        self.input
    }
}

impl<A: AnalogInput> Sensor for AnalogTemperature<A> {
    type Reading = f32;
    type Error = Error<A::Error>;

    fn read(&mut self) -> Result<f32, Self::Error> {
        self.read_celsius()
    }
}
