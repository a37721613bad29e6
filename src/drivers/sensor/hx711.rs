// HX711 24-bit load-cell ADC (PD_SCK / DOUT bit-bang)
//
// DOUT low = conversion ready. 24 clocks shift the result out MSB first,
// then 1-3 extra clocks pick channel and gain for the *next* conversion.
// Holding PD_SCK high for more than 60 us powers the chip down; the
// clock pulses must stay well under that.
//
// Async reads await DOUT going low instead of polling it.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::digital::Wait;
use log::{debug, info, warn};

use crate::error::{Error, PinResultExt};
use crate::sampling::Sensor;

const READY_POLL_MS: u32 = 1;
// 10 SPS output rate leaves 100 ms between conversions
const READY_BUDGET_MS: u32 = 500;
const POWER_DOWN_US: u32 = 70;
const CLOCK_HALF_US: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hx711Gain {
    #[default]
    A128,
    B32,
    A64,
}

impl Hx711Gain {
    const fn pulses(self) -> u8 {
        match self {
            Hx711Gain::A128 => 1,
            Hx711Gain::B32 => 2,
            Hx711Gain::A64 => 3,
        }
    }
}

pub struct Hx711<SCK, DOUT, D> {
    sck: SCK,
    dout: DOUT,
    delay: D,
    gain: Hx711Gain,
    offset: i32,
    scale: f32,
}

impl<SCK, DOUT, D> Hx711<SCK, DOUT, D>
where
    SCK: OutputPin,
    DOUT: InputPin,
    D: DelayNs,
{
    pub fn new(sck: SCK, dout: DOUT, delay: D) -> Result<Self, Error> {
        let mut hx = Self {
            sck,
            dout,
            delay,
            gain: Hx711Gain::default(),
            offset: 0,
            scale: 1.0,
        };
        hx.sck.set_low().pin_err()?;
        Ok(hx)
    }

    pub fn is_ready(&mut self) -> Result<bool, Error> {
        Ok(self.dout.is_low().pin_err()?)
    }

    fn wait_ready(&mut self) -> Result<(), Error> {
        for _ in 0..READY_BUDGET_MS {
            if self.is_ready()? {
                return Ok(());
            }
            self.delay.delay_ms(READY_POLL_MS);
        }
        warn!("HX711: DOUT never went low");
        Err(Error::Timeout)
    }

    fn pulse(&mut self) -> Result<(), Error> {
        self.sck.set_high().pin_err()?;
        self.delay.delay_us(CLOCK_HALF_US);
        self.sck.set_low().pin_err()?;
        self.delay.delay_us(CLOCK_HALF_US);
        Ok(())
    }

    fn shift_in(&mut self) -> Result<i32, Error> {
        let mut value: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high().pin_err()?;
            self.delay.delay_us(CLOCK_HALF_US);
            let bit = self.dout.is_high().pin_err()?;
            self.sck.set_low().pin_err()?;
            self.delay.delay_us(CLOCK_HALF_US);
            value = value << 1 | bit as u32;
        }
        for _ in 0..self.gain.pulses() {
            self.pulse()?;
        }
        // sign-extend 24 -> 32
        let raw = ((value << 8) as i32) >> 8;
        debug!("HX711 raw {}", raw);
        Ok(raw)
    }

    pub fn read_raw(&mut self) -> Result<i32, Error> {
        self.wait_ready()?;
        self.shift_in()
    }

    pub fn gain(&self) -> Hx711Gain {
        self.gain
    }

    /// Takes effect from the conversion after the next read.
    pub fn set_gain(&mut self, gain: Hx711Gain) {
        self.gain = gain;
    }

    /// Average `samples` reads and use the result as the zero point.
    pub fn tare(&mut self, samples: u8) -> Result<i32, Error> {
        if samples == 0 {
            return Err(Error::InvalidConfig("tare needs at least one sample"));
        }
        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += self.read_raw()? as i64;
        }
        self.offset = (sum / samples as i64) as i32;
        info!("HX711 tare offset {}", self.offset);
        Ok(self.offset)
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    /// Counts per unit (e.g. per gram) from a calibration weight.
    pub fn set_scale(&mut self, counts_per_unit: f32) -> Result<(), Error> {
        if counts_per_unit == 0.0 || !counts_per_unit.is_finite() {
            return Err(Error::InvalidConfig("scale must be finite and non-zero"));
        }
        self.scale = counts_per_unit;
        Ok(())
    }

    pub fn raw_to_units(&self, raw: i32) -> f32 {
        (raw as i64 - self.offset as i64) as f32 / self.scale
    }

    pub fn read_units(&mut self) -> Result<f32, Error> {
        let raw = self.read_raw()?;
        Ok(self.raw_to_units(raw))
    }

    pub fn power_down(&mut self) -> Result<(), Error> {
        self.sck.set_low().pin_err()?;
        self.sck.set_high().pin_err()?;
        self.delay.delay_us(POWER_DOWN_US);
        Ok(())
    }

    /// Chip resets to channel A x128 on wake.
    pub fn power_up(&mut self) -> Result<(), Error> {
        self.sck.set_low().pin_err()?;
        self.gain = Hx711Gain::A128;
        Ok(())
    }

    pub fn release(self) -> (SCK, DOUT, D) {
        (self.sck, self.dout, self.delay)
    }
}

impl<SCK, DOUT, D> Hx711<SCK, DOUT, D>
where
    SCK: OutputPin,
    DOUT: InputPin + Wait,
    D: DelayNs,
{
    pub async fn read_raw_async(&mut self) -> Result<i32, Error> {
        self.dout.wait_for_low().await.pin_err()?;
        self.shift_in()
    }
}

impl<SCK, DOUT, D> Sensor for Hx711<SCK, DOUT, D>
where
    SCK: OutputPin,
    DOUT: InputPin,
    D: DelayNs,
{
    type Reading = f32;
    type Error = Error;

    fn read(&mut self) -> Result<f32, Error> {
        self.read_units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDelay, MockPin, Wire};

    fn bits(word: u32) -> [bool; 24] {
        core::array::from_fn(|i| word >> (23 - i) & 1 != 0)
    }

    fn scale() -> (Wire, MockPin, Hx711<MockPin, MockPin, MockDelay>) {
        let wire = Wire::new();
        let dout = wire.pin("dout");
        let hx = Hx711::new(wire.pin("sck"), dout.clone(), MockDelay::new()).unwrap();
        wire.clear();
        (wire, dout, hx)
    }

    #[test]
    fn reads_word_and_selects_gain() {
        let (wire, dout, mut hx) = scale();
        dout.feed(&[true, false]);
        dout.feed(&bits(0x00_12_34));
        assert_eq!(hx.read_raw().unwrap(), 0x1234);
        assert_eq!(wire.rising_edges("sck"), 25);

        wire.clear();
        hx.set_gain(Hx711Gain::A64);
        dout.feed(&[false]);
        dout.feed(&bits(0x80_00_01));
        assert_eq!(hx.read_raw().unwrap(), -8_388_607);
        assert_eq!(wire.rising_edges("sck"), 27);
        assert_eq!(dout.pending_inputs(), 0);
    }

    #[test]
    fn tare_and_units() {
        let (_, dout, mut hx) = scale();
        for w in [1000u32, 1002, 998, 1000] {
            dout.feed(&[false]);
            dout.feed(&bits(w));
        }
        assert_eq!(hx.tare(4).unwrap(), 1000);
        hx.set_scale(2.0).unwrap();
        dout.feed(&[false]);
        dout.feed(&bits(1500));
        assert_eq!(hx.read().unwrap(), 250.0);
        assert!(hx.set_scale(0.0).is_err());
        assert!(hx.tare(0).is_err());
    }

    #[test]
    fn units_span_the_full_signed_range() {
        let (_, _, mut hx) = scale();
        hx.set_offset(-8_388_608);
        assert_eq!(hx.raw_to_units(8_388_607), 16_777_215.0);
        hx.set_offset(i32::MAX);
        assert_eq!(hx.raw_to_units(i32::MIN), -(u32::MAX as f32));
    }

    #[test]
    fn ready_follows_dout() {
        let (_, dout, mut hx) = scale();
        dout.feed(&[true, false]);
        assert!(!hx.is_ready().unwrap());
        assert!(hx.is_ready().unwrap());
    }

    #[test]
    fn not_ready_times_out() {
        let (_, dout, mut hx) = scale();
        dout.set_idle(Some(true));
        assert_eq!(hx.read_raw(), Err(Error::Timeout));
    }

    #[test]
    fn power_cycle_holds_clock_high() {
        let (wire, _, mut hx) = scale();
        hx.set_gain(Hx711Gain::B32);
        hx.power_down().unwrap();
        assert!(wire.levels("sck").ends_with(&[false, true]));
        hx.power_up().unwrap();
        assert_eq!(hx.gain(), Hx711Gain::A128);
    }

    #[test]
    fn async_read_skips_polling() {
        let (wire, dout, mut hx) = scale();
        dout.feed(&bits(0xFF_FF_FF));
        assert_eq!(embassy_futures::block_on(hx.read_raw_async()), Ok(-1));
        assert_eq!(wire.rising_edges("sck"), 25);
    }
}
