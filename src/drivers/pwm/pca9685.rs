// PCA9685 16-channel 12-bit PWM controller (I2C 0x40-0x7F)
//
// Every channel shares one period set by PRE_SCALE off the 25 MHz
// internal oscillator. PRE_SCALE is only writable while MODE1.SLEEP is
// set; after waking, the oscillator needs 500 us before RESTART.
//
// Each channel has ON and OFF counts (12 bits, little-endian pairs) at
// 0x06 + 4 * ch. Bit 4 of the high byte forces the output fully on or
// fully off, and full-off wins when both are set.

use core::cell::RefCell;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use log::{debug, info};

use crate::bus::I2cRegisters;
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x40;
pub const CHANNELS: u8 = 16;
pub const MAX_COUNT: u16 = 4095;

const OSC_HZ: u32 = 25_000_000;
const PRESCALE_MIN: u32 = 3;
const PRESCALE_MAX: u32 = 255;
const OSC_SETTLE_US: u32 = 500;

mod reg {
    pub const MODE1: u8 = 0x00;
    pub const MODE2: u8 = 0x01;
    pub const LED0_ON_L: u8 = 0x06;
    pub const ALL_LED_ON_L: u8 = 0xFA;
    pub const PRE_SCALE: u8 = 0xFE;
}

mod mode1 {
    pub const RESTART: u8 = 0x80;
    pub const AI: u8 = 0x20;
    pub const SLEEP: u8 = 0x10;
    pub const ALLCALL: u8 = 0x01;
}

// MODE2: totem-pole outputs
const OUTDRV: u8 = 0x04;
// high byte of ON or OFF
const FULL: u8 = 0x10;

/// Rounded prescale for `hz`, or `None` outside 3..=255.
pub fn prescale_for(hz: u32) -> Option<u8> {
    if hz == 0 {
        return None;
    }
    let div = hz.checked_mul(4096)?;
    let prescale = ((OSC_HZ + div / 2) / div).checked_sub(1)?;
    if (PRESCALE_MIN..=PRESCALE_MAX).contains(&prescale) {
        Some(prescale as u8)
    } else {
        None
    }
}

pub struct Pca9685<I2C> {
    regs: I2cRegisters<I2C>,
    frequency_hz: Option<u32>,
}

impl<I2C: I2c> Pca9685<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<I2C::Error>> {
        if !(0x40..=0x7F).contains(&address) {
            return Err(Error::InvalidConfig("PCA9685 address must be 0x40..=0x7F"));
        }
        Ok(Self {
            regs: I2cRegisters::new(i2c, address),
            frequency_hz: None,
        })
    }

    /// Totem-pole outputs, register auto-increment, oscillator on.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I2C::Error>> {
        self.regs.write_u8(reg::MODE2, OUTDRV)?;
        self.regs.write_u8(reg::MODE1, mode1::AI | mode1::ALLCALL)?;
        delay.delay_us(OSC_SETTLE_US);
        info!("PCA9685 @{:#04x}: ready", self.regs.address());
        Ok(())
    }

    pub fn frequency_hz(&self) -> Option<u32> {
        self.frequency_hz
    }

    pub fn set_frequency(
        &mut self,
        hz: u32,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<I2C::Error>> {
        let prescale =
            prescale_for(hz).ok_or(Error::InvalidConfig("PWM frequency outside 24..=1526 Hz"))?;

        let old = self.regs.read_u8(reg::MODE1)?;
        let awake = old & !(mode1::RESTART | mode1::SLEEP);
        self.regs.write_u8(reg::MODE1, awake | mode1::SLEEP)?;
        self.regs.write_u8(reg::PRE_SCALE, prescale)?;
        self.regs.write_u8(reg::MODE1, awake)?;
        delay.delay_us(OSC_SETTLE_US);
        self.regs.write_u8(reg::MODE1, awake | mode1::RESTART | mode1::AI)?;

        debug!("PCA9685 {} Hz (prescale {})", hz, prescale);
        self.frequency_hz = Some(hz);
        Ok(())
    }

    fn led_reg(channel: u8) -> Result<u8, Error<I2C::Error>> {
        if channel >= CHANNELS {
            return Err(Error::InvalidConfig("PCA9685 channel must be 0..=15"));
        }
        Ok(reg::LED0_ON_L + 4 * channel)
    }

    /// Output goes high at count `on` and low at count `off`.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<I2C::Error>> {
        let reg = Self::led_reg(channel)?;
        if on > MAX_COUNT || off > MAX_COUNT {
            return Err(Error::InvalidConfig("PWM counts are 12-bit"));
        }
        let [on_l, on_h] = on.to_le_bytes();
        let [off_l, off_h] = off.to_le_bytes();
        self.regs.write_all(reg, &[on_l, on_h, off_l, off_h])
    }

    pub fn set_full_on(&mut self, channel: u8) -> Result<(), Error<I2C::Error>> {
        let reg = Self::led_reg(channel)?;
        self.regs.write_all(reg, &[0, FULL, 0, 0])
    }

    pub fn set_full_off(&mut self, channel: u8) -> Result<(), Error<I2C::Error>> {
        let reg = Self::led_reg(channel)?;
        self.regs.write_all(reg, &[0, 0, 0, FULL])
    }

    /// 0 and 4095 use the full-off / full-on bits so the ends are exact.
    pub fn set_duty(&mut self, channel: u8, duty: u16) -> Result<(), Error<I2C::Error>> {
        match duty {
            0 => self.set_full_off(channel),
            MAX_COUNT => self.set_full_on(channel),
            d if d < MAX_COUNT => self.set_pwm(channel, 0, d),
            _ => Err(Error::InvalidConfig("duty must be 0..=4095")),
        }
    }

    pub fn all_off(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_all(reg::ALL_LED_ON_L, &[0, 0, 0, FULL])
    }

    /// Oscillator off; outputs stop until `wake`.
    pub fn sleep(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.modify_u8(reg::MODE1, 0, mode1::SLEEP)?;
        Ok(())
    }

    pub fn wake(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I2C::Error>> {
        let mode = self.regs.modify_u8(reg::MODE1, mode1::SLEEP, 0)?;
        if mode & mode1::RESTART != 0 {
            delay.delay_us(OSC_SETTLE_US);
            self.regs.write_u8(reg::MODE1, mode)?;
        }
        Ok(())
    }

    pub fn release(self) -> I2C {
        self.regs.release()
    }
}

/// One output as a `SetDutyCycle` (0..=4095).
pub struct Pca9685Channel<'a, I2C> {
    dev: &'a RefCell<Pca9685<I2C>>,
    channel: u8,
}

impl<'a, I2C: I2c> Pca9685Channel<'a, I2C> {
    pub fn new(dev: &'a RefCell<Pca9685<I2C>>, channel: u8) -> Result<Self, Error<I2C::Error>> {
        Pca9685::<I2C>::led_reg(channel)?;
        Ok(Self { dev, channel })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl<I2C: I2c> ErrorType for Pca9685Channel<'_, I2C> {
    type Error = Error<I2C::Error>;
}

impl<I2C: I2c> SetDutyCycle for Pca9685Channel<'_, I2C> {
    fn max_duty_cycle(&self) -> u16 {
        MAX_COUNT
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.dev.borrow_mut().set_duty(self.channel, duty)
    }
}
