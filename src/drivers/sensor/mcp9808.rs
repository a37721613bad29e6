// MCP9808 digital temperature sensor (I2C 0x18-0x1F)
//
// Temperatures are 13-bit two's complement in 1/16 degC, bits 15..13 of
// the ambient register carry the crit/upper/lower comparator flags.
// Limit registers use the same format with the two low bits unused.

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::bus::I2cRegisters;
use crate::error::Error;
use crate::sampling::Sensor;

pub const DEFAULT_ADDRESS: u8 = 0x18;

const MANUFACTURER_ID: u16 = 0x0054;
const DEVICE_ID: u8 = 0x04;

mod reg {
    pub const CONFIG: u8 = 0x01;
    pub const T_UPPER: u8 = 0x02;
    pub const T_LOWER: u8 = 0x03;
    pub const T_CRIT: u8 = 0x04;
    pub const T_AMBIENT: u8 = 0x05;
    pub const MANUFACTURER_ID: u8 = 0x06;
    pub const DEVICE_ID: u8 = 0x07;
    pub const RESOLUTION: u8 = 0x08;
}

mod config {
    pub const SHUTDOWN: u16 = 1 << 8;
    pub const ALERT_CONTROL: u16 = 1 << 3;
    pub const ALERT_SELECT: u16 = 1 << 2;
    pub const ALERT_POLARITY: u16 = 1 << 1;
    pub const ALERT_MODE: u16 = 1 << 0;
}

const MIN_LIMIT_C: f32 = -40.0;
const MAX_LIMIT_C: f32 = 125.0;

/// Conversion step; finer steps take longer (30 ms .. 250 ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    Half,
    Quarter,
    Eighth,
    #[default]
    Sixteenth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertFlags {
    pub critical: bool,
    pub upper: bool,
    pub lower: bool,
}

pub fn raw_to_celsius(raw: u16) -> f32 {
    let mut t = (raw & 0x0FFF) as f32 / 16.0;
    if raw & 0x1000 != 0 {
        t -= 256.0;
    }
    t
}

pub fn celsius_to_limit(celsius: f32) -> u16 {
    ((celsius * 16.0) as i16 as u16) & 0x1FFC
}

pub struct Mcp9808<I2C> {
    regs: I2cRegisters<I2C>,
    last: Option<f32>,
}

impl<I2C: I2c> Mcp9808<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<I2C::Error>> {
        if !(0x18..=0x1F).contains(&address) {
            return Err(Error::InvalidConfig("MCP9808 address must be 0x18..=0x1F"));
        }
        Ok(Self {
            regs: I2cRegisters::new(i2c, address),
            last: None,
        })
    }

    /// Check manufacturer and device IDs.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        let manufacturer = self.regs.read_u16_be(reg::MANUFACTURER_ID)?;
        if manufacturer != MANUFACTURER_ID {
            warn!("MCP9808: manufacturer id {:#06x}", manufacturer);
            return Err(Error::UnexpectedId {
                expected: MANUFACTURER_ID,
                found: manufacturer,
            });
        }
        let device = self.regs.read_u16_be(reg::DEVICE_ID)?;
        if (device >> 8) as u8 != DEVICE_ID {
            warn!("MCP9808: device id {:#06x}", device);
            return Err(Error::UnexpectedId {
                expected: (DEVICE_ID as u16) << 8,
                found: device,
            });
        }
        info!("MCP9808 @{:#04x}: rev {}", self.regs.address(), device & 0xFF);
        Ok(())
    }

    pub fn read_ambient(&mut self) -> Result<(f32, AlertFlags), Error<I2C::Error>> {
        let raw = self.regs.read_u16_be(reg::T_AMBIENT)?;
        let flags = AlertFlags {
            critical: raw & 0x8000 != 0,
            upper: raw & 0x4000 != 0,
            lower: raw & 0x2000 != 0,
        };
        let t = raw_to_celsius(raw);
        debug!("MCP9808 {} C", t);
        self.last = Some(t);
        Ok((t, flags))
    }

    pub fn read_celsius(&mut self) -> Result<f32, Error<I2C::Error>> {
        Ok(self.read_ambient()?.0)
    }

    pub fn last_celsius(&self) -> Option<f32> {
        self.last
    }

    pub fn set_resolution(&mut self, res: Resolution) -> Result<(), Error<I2C::Error>> {
        self.regs.write_u8(reg::RESOLUTION, res as u8)
    }

    fn modify_config(&mut self, clear: u16, set: u16) -> Result<(), Error<I2C::Error>> {
        let old = self.regs.read_u16_be(reg::CONFIG)?;
        let new = (old & !clear) | set;
        if new != old {
            self.regs.write_u16_be(reg::CONFIG, new)?;
        }
        Ok(())
    }

    /// Low-power mode; the last conversion stays readable.
    pub fn shutdown(&mut self) -> Result<(), Error<I2C::Error>> {
        self.modify_config(0, config::SHUTDOWN)
    }

    pub fn wake(&mut self) -> Result<(), Error<I2C::Error>> {
        self.modify_config(config::SHUTDOWN, 0)
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32, critical: f32) -> Result<(), Error<I2C::Error>> {
        let in_range = |c: f32| (MIN_LIMIT_C..=MAX_LIMIT_C).contains(&c);
        if !(in_range(lower) && in_range(upper) && in_range(critical)) || lower > upper {
            return Err(Error::InvalidConfig("temperature limits out of order or range"));
        }
        self.regs.write_u16_be(reg::T_LOWER, celsius_to_limit(lower))?;
        self.regs.write_u16_be(reg::T_UPPER, celsius_to_limit(upper))?;
        self.regs.write_u16_be(reg::T_CRIT, celsius_to_limit(critical))
    }

    /// Drive ALERT from the limits: comparator or interrupt output,
    /// on every limit or only T_CRIT.
    pub fn enable_alert(
        &mut self,
        interrupt: bool,
        critical_only: bool,
        active_high: bool,
    ) -> Result<(), Error<I2C::Error>> {
        let mut set = config::ALERT_CONTROL;
        if interrupt {
            set |= config::ALERT_MODE;
        }
        if critical_only {
            set |= config::ALERT_SELECT;
        }
        if active_high {
            set |= config::ALERT_POLARITY;
        }
        let clear = config::ALERT_MODE | config::ALERT_SELECT | config::ALERT_POLARITY;
        self.modify_config(clear, set)
    }

    pub fn disable_alert(&mut self) -> Result<(), Error<I2C::Error>> {
        self.modify_config(config::ALERT_CONTROL, 0)
    }

    pub fn release(self) -> I2C {
        self.regs.release()
    }
}

impl<I2C: I2c> Sensor for Mcp9808<I2C> {
    type Reading = f32;
    type Error = Error<I2C::Error>;

    fn read(&mut self) -> Result<f32, Self::Error> {
        self.read_celsius()
    }
}
