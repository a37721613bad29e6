// BH1750 ambient light sensor (I2C 0x23 with ADDR low, 0x5C high)
//
// Command-only chip: no register pointer, every write is one opcode and
// a read returns the 16-bit count. One-time modes power down after the
// conversion, so each read re-sends the mode opcode and waits.
//
// MTreg scales the integration time (31..=254, 69 nominal); counts scale
// with it, so lux is normalised back by 69/MTreg.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info};

use crate::bus::I2cRegisters;
use crate::error::Error;
use crate::sampling::Sensor;

pub const ADDRESS_LOW: u8 = 0x23;
pub const ADDRESS_HIGH: u8 = 0x5C;

pub const DEFAULT_MTREG: u8 = 69;
pub const MIN_MTREG: u8 = 31;
pub const MAX_MTREG: u8 = 254;

mod op {
    pub const POWER_DOWN: u8 = 0x00;
    pub const POWER_ON: u8 = 0x01;
    pub const RESET: u8 = 0x07;
    pub const MTREG_HIGH: u8 = 0x40;
    pub const MTREG_LOW: u8 = 0x60;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementMode {
    /// 1 lx, 120 ms
    #[default]
    ContinuousHigh,
    /// 0.5 lx, 120 ms
    ContinuousHigh2,
    /// 4 lx, 16 ms
    ContinuousLow,
    OneTimeHigh,
    OneTimeHigh2,
    OneTimeLow,
}

impl MeasurementMode {
    const fn opcode(self) -> u8 {
        match self {
            MeasurementMode::ContinuousHigh => 0x10,
            MeasurementMode::ContinuousHigh2 => 0x11,
            MeasurementMode::ContinuousLow => 0x13,
            MeasurementMode::OneTimeHigh => 0x20,
            MeasurementMode::OneTimeHigh2 => 0x21,
            MeasurementMode::OneTimeLow => 0x23,
        }
    }

    const fn one_time(self) -> bool {
        matches!(
            self,
            MeasurementMode::OneTimeHigh | MeasurementMode::OneTimeHigh2 | MeasurementMode::OneTimeLow
        )
    }

    const fn half_lux(self) -> bool {
        matches!(self, MeasurementMode::ContinuousHigh2 | MeasurementMode::OneTimeHigh2)
    }

    // datasheet max conversion time at MTreg = 69
    const fn base_time_ms(self) -> u32 {
        match self {
            MeasurementMode::ContinuousLow | MeasurementMode::OneTimeLow => 24,
            _ => 180,
        }
    }
}

pub struct Bh1750<I2C, D> {
    regs: I2cRegisters<I2C>,
    delay: D,
    mode: MeasurementMode,
    mtreg: u8,
    // a continuous mode is converting
    running: bool,
    last: Option<f32>,
}

impl<I2C, D> Bh1750<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, address: u8, delay: D) -> Result<Self, Error<I2C::Error>> {
        if address != ADDRESS_LOW && address != ADDRESS_HIGH {
            return Err(Error::InvalidConfig("BH1750 address must be 0x23 or 0x5C"));
        }
        Ok(Self {
            regs: I2cRegisters::new(i2c, address),
            delay,
            mode: MeasurementMode::default(),
            mtreg: DEFAULT_MTREG,
            running: false,
            last: None,
        })
    }

    /// Power on, clear the data register, start the configured mode.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.command(op::POWER_ON)?;
        self.regs.command(op::RESET)?;
        let mode = self.mode;
        self.set_mode(mode)?;
        info!("BH1750 @{:#04x}: {:?}", self.regs.address(), self.mode);
        Ok(())
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    /// Continuous modes start immediately and wait out the first
    /// conversion; one-time modes are triggered by each read.
    pub fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), Error<I2C::Error>> {
        self.mode = mode;
        self.running = false;
        if !mode.one_time() {
            self.regs.command(mode.opcode())?;
            self.running = true;
            self.delay.delay_ms(self.measurement_time_ms());
        }
        Ok(())
    }

    pub fn measurement_time_ms(&self) -> u32 {
        let base = self.mode.base_time_ms();
        (base * self.mtreg as u32).div_ceil(DEFAULT_MTREG as u32)
    }

    pub fn set_measurement_time(&mut self, mtreg: u8) -> Result<(), Error<I2C::Error>> {
        if !(MIN_MTREG..=MAX_MTREG).contains(&mtreg) {
            return Err(Error::InvalidConfig("MTreg must be 31..=254"));
        }
        self.regs.command(op::MTREG_HIGH | mtreg >> 5)?;
        self.regs.command(op::MTREG_LOW | (mtreg & 0x1F))?;
        self.mtreg = mtreg;
        // the new MTreg only applies from the next mode opcode
        if self.running {
            self.regs.command(self.mode.opcode())?;
            self.delay.delay_ms(self.measurement_time_ms());
        }
        Ok(())
    }

    pub fn raw_to_lux(&self, raw: u16) -> f32 {
        // counts / 1.2
        let mut lux = raw as f32 * 5.0 / 6.0 * (DEFAULT_MTREG as f32 / self.mtreg as f32);
        if self.mode.half_lux() {
            lux /= 2.0;
        }
        lux
    }

    pub fn read_raw(&mut self) -> Result<u16, Error<I2C::Error>> {
        if self.mode.one_time() {
            self.regs.command(self.mode.opcode())?;
            self.delay.delay_ms(self.measurement_time_ms());
        }
        let mut buf = [0u8; 2];
        self.regs.read_raw(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_lux(&mut self) -> Result<f32, Error<I2C::Error>> {
        let raw = self.read_raw()?;
        let lux = self.raw_to_lux(raw);
        debug!("BH1750 {} lx", lux);
        self.last = Some(lux);
        Ok(lux)
    }

    pub fn last_lux(&self) -> Option<f32> {
        self.last
    }

    pub fn power_down(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.command(op::POWER_DOWN)?;
        self.running = false;
        Ok(())
    }

    pub fn release(self) -> (I2C, D) {
        (self.regs.release(), self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> Sensor for Bh1750<I2C, D> {
    type Reading = f32;
    type Error = Error<I2C::Error>;

    fn read(&mut self) -> Result<f32, Self::Error> {
        self.read_lux()
    }
}
