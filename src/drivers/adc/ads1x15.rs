// ADS1015 (12-bit) / ADS1115 (16-bit) I2C ADC
//
// Single-shot only: write CONFIG with OS set, wait one conversion period,
// then poll OS (reads 1 once idle) before reading CONVERSION. With the
// ALERT/RDY pin wired and enable_ready_pin() called, read_raw_async
// awaits the pin's falling edge instead of polling.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal_async::digital::Wait;
use log::{debug, info, warn};

use crate::analog::AnalogInput;
use crate::bus::I2cRegisters;
use crate::error::{Error, PinResultExt};

pub const DEFAULT_ADDRESS: u8 = 0x48;

mod reg {
    pub const CONVERSION: u8 = 0x00;
    pub const CONFIG: u8 = 0x01;
    pub const LO_THRESH: u8 = 0x02;
    pub const HI_THRESH: u8 = 0x03;
}

mod cfg {
    pub const OS: u16 = 1 << 15;
    pub const MUX_SHIFT: u16 = 12;
    pub const PGA_SHIFT: u16 = 9;
    pub const MODE_SINGLE: u16 = 1 << 8;
    pub const DR_SHIFT: u16 = 5;
    // assert after one conversion
    pub const COMP_QUE_ONE: u16 = 0b00;
    pub const COMP_QUE_DISABLE: u16 = 0b11;
}

// OS polls after the nominal conversion time
const READY_POLL_US: u32 = 100;
const READY_POLL_BUDGET: u32 = 50;

const ADS1115_RATES: [u16; 8] = [8, 16, 32, 64, 128, 250, 475, 860];
const ADS1015_RATES: [u16; 7] = [128, 250, 490, 920, 1600, 2400, 3300];
// 128 SPS on the ADS1115, 1600 SPS on the ADS1015
const DEFAULT_RATE_CODE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Ads1015,
    Ads1115,
}

impl Variant {
    fn rates(self) -> &'static [u16] {
        match self {
            Variant::Ads1015 => &ADS1015_RATES,
            Variant::Ads1115 => &ADS1115_RATES,
        }
    }

    // counts spanning the positive half of the full-scale range
    const fn half_scale(self) -> i32 {
        match self {
            Variant::Ads1015 => 2048,
            Variant::Ads1115 => 32768,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Diff0_1,
    Diff0_3,
    Diff1_3,
    Diff2_3,
    Single0,
    Single1,
    Single2,
    Single3,
}

impl Channel {
    const fn mux(self) -> u16 {
        self as u16
    }
}

/// Programmable gain, named by full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    Fsr6_144V,
    Fsr4_096V,
    #[default]
    Fsr2_048V,
    Fsr1_024V,
    Fsr0_512V,
    Fsr0_256V,
}

impl Gain {
    const fn pga(self) -> u16 {
        self as u16
    }

    pub const fn full_scale_mv(self) -> i32 {
        match self {
            Gain::Fsr6_144V => 6144,
            Gain::Fsr4_096V => 4096,
            Gain::Fsr2_048V => 2048,
            Gain::Fsr1_024V => 1024,
            Gain::Fsr0_512V => 512,
            Gain::Fsr0_256V => 256,
        }
    }
}

pub struct Ads1x15<I2C, D> {
    regs: I2cRegisters<I2C>,
    delay: D,
    variant: Variant,
    gain: Gain,
    rate_code: u8,
    ready_pin: bool,
    last_raw: Option<i16>,
}

impl<I2C, D> Ads1x15<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(
        i2c: I2C,
        address: u8,
        variant: Variant,
        delay: D,
    ) -> Result<Self, Error<I2C::Error>> {
        if !(0x48..=0x4B).contains(&address) {
            return Err(Error::InvalidConfig("ADS1x15 address must be 0x48..=0x4B"));
        }
        Ok(Self {
            regs: I2cRegisters::new(i2c, address),
            delay,
            variant,
            gain: Gain::default(),
            rate_code: DEFAULT_RATE_CODE,
            ready_pin: false,
            last_raw: None,
        })
    }

    pub fn new_ads1115(i2c: I2C, address: u8, delay: D) -> Result<Self, Error<I2C::Error>> {
        Self::new(i2c, address, Variant::Ads1115, delay)
    }

    pub fn new_ads1015(i2c: I2C, address: u8, delay: D) -> Result<Self, Error<I2C::Error>> {
        Self::new(i2c, address, Variant::Ads1015, delay)
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    pub fn data_rate(&self) -> u16 {
        self.variant.rates()[self.rate_code as usize]
    }

    /// Samples per second; must be one of the variant's listed rates.
    pub fn set_data_rate(&mut self, sps: u16) -> Result<(), Error<I2C::Error>> {
        match self.variant.rates().iter().position(|&r| r == sps) {
            Some(code) => {
                self.rate_code = code as u8;
                Ok(())
            }
            None => Err(Error::InvalidConfig("unsupported data rate")),
        }
    }

    /// Route conversion-ready to ALERT/RDY: thresholds 0x8000/0x0000,
    /// comparator asserting after one conversion.
    pub fn enable_ready_pin(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_u16_be(reg::HI_THRESH, 0x8000)?;
        self.regs.write_u16_be(reg::LO_THRESH, 0x0000)?;
        self.ready_pin = true;
        info!("ADS1x15 @{:#04x}: ALERT/RDY enabled", self.regs.address());
        Ok(())
    }

    fn config_word(&self, channel: Channel) -> u16 {
        let que = if self.ready_pin {
            cfg::COMP_QUE_ONE
        } else {
            cfg::COMP_QUE_DISABLE
        };
        cfg::OS
            | channel.mux() << cfg::MUX_SHIFT
            | self.gain.pga() << cfg::PGA_SHIFT
            | cfg::MODE_SINGLE
            | (self.rate_code as u16) << cfg::DR_SHIFT
            | que
    }

    fn conversion_time_us(&self) -> u32 {
        1_000_000 / self.data_rate() as u32 + 50
    }

    fn finish(&mut self) -> Result<i16, Error<I2C::Error>> {
        let word = self.regs.read_u16_be(reg::CONVERSION)? as i16;
        let raw = match self.variant {
            Variant::Ads1015 => word >> 4,
            Variant::Ads1115 => word,
        };
        debug!("ADS1x15 raw {}", raw);
        self.last_raw = Some(raw);
        Ok(raw)
    }

    pub fn read_raw(&mut self, channel: Channel) -> Result<i16, Error<I2C::Error>> {
        self.regs.write_u16_be(reg::CONFIG, self.config_word(channel))?;
        self.delay.delay_us(self.conversion_time_us());

        let mut polls = 0;
        while self.regs.read_u16_be(reg::CONFIG)? & cfg::OS == 0 {
            polls += 1;
            if polls >= READY_POLL_BUDGET {
                warn!("ADS1x15: conversion did not complete");
                return Err(Error::Timeout);
            }
            self.delay.delay_us(READY_POLL_US);
        }
        self.finish()
    }

    /// Single-shot read paced by the ALERT/RDY pin.
    pub async fn read_raw_async<W: Wait>(
        &mut self,
        channel: Channel,
        ready: &mut W,
    ) -> Result<i16, Error<I2C::Error>> {
        if !self.ready_pin {
            return Err(Error::InvalidConfig("ALERT/RDY not enabled"));
        }
        self.regs.write_u16_be(reg::CONFIG, self.config_word(channel))?;
        ready.wait_for_falling_edge().await.pin_err()?;
        self.finish()
    }

    pub fn raw_to_mv(&self, raw: i16) -> i32 {
        raw as i32 * self.gain.full_scale_mv() / self.variant.half_scale()
    }

    pub fn read_mv(&mut self, channel: Channel) -> Result<i32, Error<I2C::Error>> {
        let raw = self.read_raw(channel)?;
        Ok(self.raw_to_mv(raw))
    }

    pub fn last_raw(&self) -> Option<i16> {
        self.last_raw
    }

    /// Borrow one input as an `AnalogInput`.
    pub fn channel(&mut self, channel: Channel) -> AdsChannel<'_, I2C, D> {
        AdsChannel { adc: self, channel }
    }

    pub fn release(self) -> (I2C, D) {
        (self.regs.release(), self.delay)
    }
}

pub struct AdsChannel<'a, I2C, D> {
    adc: &'a mut Ads1x15<I2C, D>,
    channel: Channel,
}

// negative differential readings clamp to 0 mV
impl<I2C, D> AnalogInput for AdsChannel<'_, I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = Error<I2C::Error>;

    fn read_mv(&mut self) -> nb::Result<u16, Self::Error> {
        let mv = self.adc.read_mv(self.channel)?;
        Ok(mv.clamp(0, u16::MAX as i32) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{I2cOp, I2cScript, MockDelay, Wire};

    const ADDR: u8 = 0x48;

    #[test]
    fn rejects_bad_address() {
        let r = Ads1x15::new_ads1115(I2cScript::default(), 0x50, MockDelay::new());
        assert!(matches!(r, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn single_shot_ads1115() {
        // AIN1 single-ended, ±4.096 V, 128 SPS: 0xD383
        let bus = I2cScript::new([
            I2cOp::write(ADDR, &[0x01, 0xD3, 0x83]),
            I2cOp::write_read(ADDR, &[0x01], &[0x53, 0x83]),
            I2cOp::write_read(ADDR, &[0x01], &[0xD3, 0x83]),
            I2cOp::write_read(ADDR, &[0x00], &[0x40, 0x00]),
        ]);
        let delay = MockDelay::new();
        let mut adc = Ads1x15::new_ads1115(bus.clone(), ADDR, delay.clone()).unwrap();
        adc.set_gain(Gain::Fsr4_096V);

        assert_eq!(adc.read_raw(Channel::Single1).unwrap(), 0x4000);
        assert_eq!(adc.raw_to_mv(0x4000), 2048);
        assert_eq!(adc.last_raw(), Some(0x4000));
        // 1/128 s + margin, then one 100 µs poll
        assert_eq!(delay.elapsed_us(), 7812 + 50 + 100);
        bus.done();
    }

    #[test]
    fn ads1015_shifts_and_keeps_sign() {
        let bus = I2cScript::new([
            I2cOp::write(ADDR, &[0x01, 0x85, 0x83]),
            I2cOp::write_read(ADDR, &[0x01], &[0x85, 0x83]),
            I2cOp::write_read(ADDR, &[0x00], &[0xFF, 0xF0]),
        ]);
        let mut adc = Ads1x15::new_ads1015(bus.clone(), ADDR, MockDelay::new()).unwrap();
        assert_eq!(adc.read_mv(Channel::Diff0_1).unwrap(), -1);
        bus.done();
    }

    #[test]
    fn conversion_timeout() {
        let mut ops = std::vec![I2cOp::write(ADDR, &[0x01, 0xC5, 0x83])];
        for _ in 0..READY_POLL_BUDGET {
            ops.push(I2cOp::write_read(ADDR, &[0x01], &[0x45, 0x83]));
        }
        let bus = I2cScript::new(ops);
        let mut adc = Ads1x15::new_ads1115(bus.clone(), ADDR, MockDelay::new()).unwrap();
        assert_eq!(adc.read_raw(Channel::Single0), Err(Error::Timeout));
        bus.done();
    }

    #[test]
    fn data_rate_must_match_variant() {
        let mut adc = Ads1x15::new_ads1115(I2cScript::default(), ADDR, MockDelay::new()).unwrap();
        assert!(adc.set_data_rate(860).is_ok());
        assert_eq!(adc.data_rate(), 860);
        assert!(adc.set_data_rate(1600).is_err());
    }

    #[test]
    fn ready_pin_path() {
        let bus = I2cScript::new([
            I2cOp::write(ADDR, &[0x03, 0x80, 0x00]),
            I2cOp::write(ADDR, &[0x02, 0x00, 0x00]),
            // comparator queue now 0b00
            I2cOp::write(ADDR, &[0x01, 0xF5, 0x80]),
            I2cOp::write_read(ADDR, &[0x00], &[0x12, 0x34]),
        ]);
        let wire = Wire::new();
        let mut rdy = wire.pin("rdy");
        let mut adc = Ads1x15::new_ads1115(bus.clone(), ADDR, MockDelay::new()).unwrap();
        let early = embassy_futures::block_on(adc.read_raw_async(Channel::Single3, &mut rdy));
        assert!(matches!(early, Err(Error::InvalidConfig(_))));

        adc.enable_ready_pin().unwrap();
        let raw = embassy_futures::block_on(adc.read_raw_async(Channel::Single3, &mut rdy));
        assert_eq!(raw, Ok(0x1234));
        bus.done();
    }

    #[test]
    fn channel_adapter_blocks_through_nb() {
        let bus = I2cScript::new([
            I2cOp::write(ADDR, &[0x01, 0xC5, 0x83]),
            I2cOp::write_read(ADDR, &[0x01], &[0xC5, 0x83]),
            I2cOp::write_read(ADDR, &[0x00], &[0x0C, 0x80]),
        ]);
        let mut adc = Ads1x15::new_ads1115(bus.clone(), ADDR, MockDelay::new()).unwrap();
        let mut ch = adc.channel(Channel::Single0);
        // 0x0C80 = 3200 counts at ±2.048 V
        assert_eq!(nb::block!(ch.read_mv()), Ok(200));
        bus.done();
    }
}
