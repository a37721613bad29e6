// TM1637 LED driver (4 or 6 digit, two-wire bit-banged)
//
// Not I2C: no address, bytes go LSB first, and the chip pulls DIO low
// for one clock after every byte as ACK. DIO must be an open-drain pin
// that can be read back while released high.
//
// Every transfer is start, bytes, stop. A missing ACK still sends stop
// so the chip is back in idle for the next try.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use super::segments::{self, BLANK, DOT, MINUS};
use crate::error::{Error, PinResultExt};

pub const DEFAULT_BIT_DELAY_US: u32 = 5;
pub const MAX_BRIGHTNESS: u8 = 7;
const MAX_DIGITS: usize = 6;

mod cmd {
    // data write, auto-increment address
    pub const DATA_AUTO: u8 = 0x40;
    pub const ADDRESS: u8 = 0xC0;
    pub const DISPLAY: u8 = 0x80;
    pub const DISPLAY_ON: u8 = 0x08;
}

pub struct Tm1637<CLK, DIO, D> {
    clk: CLK,
    dio: DIO,
    delay: D,
    digits: u8,
    bit_delay_us: u32,
    brightness: u8,
    on: bool,
    colon: bool,
    segments: [u8; MAX_DIGITS],
}

impl<CLK, DIO, D> Tm1637<CLK, DIO, D>
where
    CLK: OutputPin,
    DIO: OutputPin + InputPin,
    D: DelayNs,
{
    pub fn new(clk: CLK, dio: DIO, delay: D, digits: u8) -> Result<Self, Error> {
        if !matches!(digits, 4 | 6) {
            return Err(Error::InvalidConfig("TM1637 digit count must be 4 or 6"));
        }
        Ok(Self {
            clk,
            dio,
            delay,
            digits,
            bit_delay_us: DEFAULT_BIT_DELAY_US,
            brightness: MAX_BRIGHTNESS,
            on: true,
            colon: false,
            segments: [BLANK; MAX_DIGITS],
        })
    }

    pub fn set_bit_delay_us(&mut self, us: u32) {
        self.bit_delay_us = us;
    }

    pub fn digits(&self) -> u8 {
        self.digits
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Segment bytes as last written, colon included.
    pub fn segments(&self) -> &[u8] {
        &self.segments[..self.digits as usize]
    }

    // ── Wire protocol ───────────────────────────────────────────────

    fn wait(&mut self) {
        self.delay.delay_us(self.bit_delay_us);
    }

    fn start(&mut self) -> Result<(), Error> {
        self.dio.set_high().pin_err()?;
        self.clk.set_high().pin_err()?;
        self.wait();
        self.dio.set_low().pin_err()?;
        self.wait();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.clk.set_low().pin_err()?;
        self.wait();
        self.dio.set_low().pin_err()?;
        self.wait();
        self.clk.set_high().pin_err()?;
        self.wait();
        self.dio.set_high().pin_err()?;
        self.wait();
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        for i in 0..8 {
            self.clk.set_low().pin_err()?;
            if byte >> i & 1 != 0 {
                self.dio.set_high().pin_err()?;
            } else {
                self.dio.set_low().pin_err()?;
            }
            self.wait();
            self.clk.set_high().pin_err()?;
            self.wait();
        }

        // ninth clock: release DIO, chip pulls it low
        self.clk.set_low().pin_err()?;
        self.dio.set_high().pin_err()?;
        self.wait();
        self.clk.set_high().pin_err()?;
        self.wait();
        let ack = self.dio.is_low().pin_err()?;
        self.clk.set_low().pin_err()?;
        self.wait();

        if ack { Ok(()) } else { Err(Error::NoAck) }
    }

    fn transfer(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.start()?;
        for &b in bytes {
            if let Err(e) = self.write_byte(b) {
                warn!("TM1637: no ACK for {:#04x}", b);
                let _ = self.stop();
                return Err(e);
            }
        }
        self.stop()
    }

    fn send_display_control(&mut self) -> Result<(), Error> {
        let on = if self.on { cmd::DISPLAY_ON } else { 0 };
        self.transfer(&[cmd::DISPLAY | on | self.brightness])
    }

    // ── Display operations ──────────────────────────────────────────

    pub fn set_brightness(&mut self, level: u8) -> Result<(), Error> {
        if level > MAX_BRIGHTNESS {
            return Err(Error::InvalidConfig("TM1637 brightness must be 0..=7"));
        }
        self.brightness = level;
        self.send_display_control()
    }

    pub fn set_on(&mut self, on: bool) -> Result<(), Error> {
        self.on = on;
        self.send_display_control()
    }

    /// Raw segment bytes starting at digit `pos` (0 = leftmost).
    pub fn write_segments(&mut self, pos: u8, segs: &[u8]) -> Result<(), Error> {
        let start = pos as usize;
        let end = start + segs.len();
        if end > self.digits as usize {
            return Err(Error::InvalidConfig("segments past last digit"));
        }
        let mut shown = self.segments;
        shown[start..end].copy_from_slice(segs);
        if self.colon {
            shown[1] |= DOT;
        }

        let mut frame = [0u8; MAX_DIGITS + 1];
        frame[0] = cmd::ADDRESS | pos;
        frame[1..=segs.len()].copy_from_slice(&shown[start..end]);

        self.transfer(&[cmd::DATA_AUTO])?;
        self.transfer(&frame[..=segs.len()])?;
        self.send_display_control()?;
        self.segments = shown;
        Ok(())
    }

    /// Blank every digit and drop the colon.
    pub fn clear(&mut self) -> Result<(), Error> {
        let colon = core::mem::replace(&mut self.colon, false);
        let blank = [BLANK; MAX_DIGITS];
        let result = self.write_segments(0, &blank[..self.digits as usize]);
        if result.is_err() {
            self.colon = colon;
        }
        result
    }

    /// Hex digit values (0..=15) starting at `pos`.
    pub fn show_digits(&mut self, pos: u8, values: &[u8]) -> Result<(), Error> {
        let mut segs = [BLANK; MAX_DIGITS];
        if values.len() > MAX_DIGITS {
            return Err(Error::InvalidConfig("segments past last digit"));
        }
        for (s, &v) in segs.iter_mut().zip(values) {
            *s = segments::digit(v).ok_or(Error::InvalidConfig("digit value above 0xF"))?;
        }
        self.write_segments(pos, &segs[..values.len()])
    }

    /// Text starting at `pos`. A '.' lights the decimal point of the
    /// glyph before it instead of taking a digit.
    pub fn show_text(&mut self, pos: u8, text: &str) -> Result<(), Error> {
        let mut segs = [BLANK; MAX_DIGITS];
        let mut n = 0;
        for c in text.chars() {
            if c == '.' && n > 0 {
                segs[n - 1] |= DOT;
                continue;
            }
            if n == MAX_DIGITS {
                return Err(Error::InvalidConfig("segments past last digit"));
            }
            segs[n] = if c == '.' {
                DOT
            } else {
                segments::encode_char(c).ok_or(Error::InvalidConfig("no glyph for character"))?
            };
            n += 1;
        }
        self.write_segments(pos, &segs[..n])
    }

    /// Decimal, right-aligned, leading minus for negatives.
    pub fn show_number(&mut self, value: i32) -> Result<(), Error> {
        let width = self.digits as usize;
        let mut segs = [BLANK; MAX_DIGITS];
        let mut rest = (value as i64).unsigned_abs();
        let mut i = width;
        loop {
            if i == 0 {
                return Err(Error::InvalidConfig("number does not fit the display"));
            }
            i -= 1;
            segs[i] = segments::DIGITS[(rest % 10) as usize];
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        if value < 0 {
            if i == 0 {
                return Err(Error::InvalidConfig("number does not fit the display"));
            }
            segs[i - 1] = MINUS;
        }
        debug!("TM1637 show {}", value);
        self.write_segments(0, &segs[..width])
    }

    /// Colon is the DP bit of digit 1; kept across later writes.
    pub fn show_colon(&mut self, on: bool) -> Result<(), Error> {
        let was = core::mem::replace(&mut self.colon, on);
        let seg = if on {
            self.segments[1] | DOT
        } else {
            self.segments[1] & !DOT
        };
        let result = self.write_segments(1, &[seg]);
        if result.is_err() {
            self.colon = was;
        }
        result
    }

    pub fn release(self) -> (CLK, DIO, D) {
        (self.clk, self.dio, self.delay)
    }
}
