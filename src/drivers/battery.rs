// Li-ion battery voltage estimation
//
// The cell is read through a resistive divider on an analog input;
// multiply by the divider ratio for the actual cell voltage.
// Linear approximation between the empty and full voltages
// (default 4200mV = 100%, 3000mV = 0%, 100K/100K divider).

use log::debug;

use crate::analog::AnalogInput;
use crate::error::Error;
use crate::sampling::Sensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryConfig {
    /// Cell voltage / pin voltage.
    pub divider: u16,
    pub full_mv: u16,
    pub empty_mv: u16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            divider: 2,
            full_mv: 4200,
            empty_mv: 3000,
        }
    }
}

impl BatteryConfig {
    pub fn adc_to_battery_mv(&self, adc_mv: u16) -> u16 {
        (adc_mv as u32 * self.divider as u32).min(u16::MAX as u32) as u16
    }

    pub fn percentage(&self, battery_mv: u16) -> u8 {
        let mv = battery_mv as u32;
        let full = self.full_mv as u32;
        let empty = self.empty_mv as u32;
        if mv >= full {
            100
        } else if mv <= empty {
            0
        } else {
            ((mv - empty) * 100 / (full - empty)) as u8
        }
    }
}

pub struct BatteryMonitor<A> {
    input: A,
    config: BatteryConfig,
}

impl<A: AnalogInput> BatteryMonitor<A> {
    pub fn new(input: A, config: BatteryConfig) -> Result<Self, Error<A::Error>> {
        if config.divider == 0 {
            return Err(Error::InvalidConfig("divider ratio must be non-zero"));
        }
        if config.full_mv <= config.empty_mv {
            return Err(Error::InvalidConfig("full voltage must be above empty"));
        }
        Ok(Self { input, config })
    }

    pub fn config(&self) -> BatteryConfig {
        self.config
    }

    pub fn voltage_mv(&mut self) -> Result<u16, Error<A::Error>> {
        let adc_mv = nb::block!(self.input.read_mv()).map_err(Error::Bus)?;
        let mv = self.config.adc_to_battery_mv(adc_mv);
        debug!("battery {} mV (pin {} mV)", mv, adc_mv);
        Ok(mv)
    }

    pub fn percentage(&mut self) -> Result<u8, Error<A::Error>> {
        let mv = self.voltage_mv()?;
        Ok(self.config.percentage(mv))
    }

    pub fn release(self) -> A {
        self.input
    }
}

// reading is cell millivolts; percentage is derived
impl<A: AnalogInput> Sensor for BatteryMonitor<A> {
    type Reading = u16;
    type Error = Error<A::Error>;

    fn read(&mut self) -> Result<u16, Self::Error> {
        self.voltage_mv()
    }
}
