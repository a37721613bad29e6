// ADXL345 3-axis accelerometer (I2C 0x53 with SDO low, 0x1D high)
//
// FULL_RES is always set, so every range reads at 3.9 mg/LSB and only
// the number of significant bits grows with the range. Data registers
// are little-endian, X/Y/Z in one 6-byte burst so the axes come from
// the same sample.

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::bus::I2cRegisters;
use crate::error::Error;
use crate::sampling::{Delta, Sensor};

pub const ADDRESS_LOW: u8 = 0x53;
pub const ADDRESS_HIGH: u8 = 0x1D;

const DEVICE_ID: u8 = 0xE5;
// 100 Hz output data rate
const DEFAULT_RATE: u8 = 0x0A;
const MAX_RATE: u8 = 0x0F;

mod reg {
    pub const DEVID: u8 = 0x00;
    pub const OFSX: u8 = 0x1E;
    pub const BW_RATE: u8 = 0x2C;
    pub const POWER_CTL: u8 = 0x2D;
    pub const INT_SOURCE: u8 = 0x30;
    pub const DATA_FORMAT: u8 = 0x31;
    pub const DATAX0: u8 = 0x32;
}

const MEASURE: u8 = 0x08;
const DATA_READY: u8 = 0x80;
const FULL_RES: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Range {
    #[default]
    G2,
    G4,
    G8,
    G16,
}

/// Acceleration in milli-g.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acceleration {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Acceleration {
    fn from_raw(raw: [i16; 3]) -> Self {
        // 3.9 mg/LSB
        let mg = |v: i16| v as i32 * 39 / 10;
        Self {
            x: mg(raw[0]),
            y: mg(raw[1]),
            z: mg(raw[2]),
        }
    }
}

// largest single-axis change
impl Delta for Acceleration {
    fn delta(&self, other: &Self) -> f32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        dx.max(dy).max(dz) as f32
    }
}

pub struct Adxl345<I2C> {
    regs: I2cRegisters<I2C>,
    range: Range,
    last: Option<Acceleration>,
}

impl<I2C: I2c> Adxl345<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<I2C::Error>> {
        if address != ADDRESS_LOW && address != ADDRESS_HIGH {
            return Err(Error::InvalidConfig("ADXL345 address must be 0x53 or 0x1D"));
        }
        Ok(Self {
            regs: I2cRegisters::new(i2c, address),
            range: Range::default(),
            last: None,
        })
    }

    /// Check DEVID, set format and rate, start measuring.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        let id = self.regs.read_u8(reg::DEVID)?;
        if id != DEVICE_ID {
            warn!("ADXL345: DEVID {:#04x}", id);
            return Err(Error::UnexpectedId {
                expected: DEVICE_ID as u16,
                found: id as u16,
            });
        }
        let range = self.range;
        self.set_range(range)?;
        self.set_data_rate(DEFAULT_RATE)?;
        self.regs.write_u8(reg::POWER_CTL, MEASURE)?;
        info!("ADXL345 @{:#04x}: measuring", self.regs.address());
        Ok(())
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn set_range(&mut self, range: Range) -> Result<(), Error<I2C::Error>> {
        self.regs.write_u8(reg::DATA_FORMAT, FULL_RES | range as u8)?;
        self.range = range;
        Ok(())
    }

    /// BW_RATE rate code, 0x0A = 100 Hz, each step doubles.
    pub fn set_data_rate(&mut self, code: u8) -> Result<(), Error<I2C::Error>> {
        if code > MAX_RATE {
            return Err(Error::InvalidConfig("ADXL345 rate code must be 0..=0x0F"));
        }
        self.regs.write_u8(reg::BW_RATE, code)
    }

    /// Per-axis trim in 15.6 mg steps, added to every sample.
    pub fn set_offsets(&mut self, x: i8, y: i8, z: i8) -> Result<(), Error<I2C::Error>> {
        self.regs.write_all(reg::OFSX, &[x as u8, y as u8, z as u8])
    }

    pub fn data_ready(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.regs.read_u8(reg::INT_SOURCE)? & DATA_READY != 0)
    }

    pub fn read_raw(&mut self) -> Result<[i16; 3], Error<I2C::Error>> {
        let mut buf = [0u8; 6];
        self.regs.read_into(reg::DATAX0, &mut buf)?;
        Ok([
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        ])
    }

    pub fn read_mg(&mut self) -> Result<Acceleration, Error<I2C::Error>> {
        let accel = Acceleration::from_raw(self.read_raw()?);
        debug!("ADXL345 {:?}", accel);
        self.last = Some(accel);
        Ok(accel)
    }

    pub fn last_mg(&self) -> Option<Acceleration> {
        self.last
    }

    pub fn standby(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_u8(reg::POWER_CTL, 0)
    }

    pub fn release(self) -> I2C {
        self.regs.release()
    }
}

impl<I2C: I2c> Sensor for Adxl345<I2C> {
    type Reading = Acceleration;
    type Error = Error<I2C::Error>;

    fn read(&mut self) -> Result<Acceleration, Self::Error> {
        self.read_mg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::Sampler;
    use crate::testing::{I2cOp, I2cScript};

    const ADDR: u8 = ADDRESS_LOW;

    #[test]
    fn init_sequence() {
        let bus = I2cScript::new([
            I2cOp::write_read(ADDR, &[0x00], &[0xE5]),
            I2cOp::write(ADDR, &[0x31, 0x08]),
            I2cOp::write(ADDR, &[0x2C, 0x0A]),
            I2cOp::write(ADDR, &[0x2D, 0x08]),
        ]);
        let mut a = Adxl345::new(bus.clone(), ADDR).unwrap();
        a.init().unwrap();
        bus.done();
    }

    #[test]
    fn wrong_id() {
        let bus = I2cScript::new([I2cOp::write_read(ADDR, &[0x00], &[0x00])]);
        let mut a = Adxl345::new(bus.clone(), ADDR).unwrap();
        assert_eq!(
            a.init(),
            Err(Error::UnexpectedId {
                expected: 0xE5,
                found: 0
            })
        );
    }

    #[test]
    fn reads_signed_milli_g() {
        let bus = I2cScript::new([
            I2cOp::write_read(ADDR, &[0x30], &[0x83]),
            // x = 10, y = -10, z = 256 (1 g)
            I2cOp::write_read(ADDR, &[0x32], &[0x0A, 0x00, 0xF6, 0xFF, 0x00, 0x01]),
        ]);
        let mut a = Adxl345::new(bus.clone(), ADDR).unwrap();
        assert!(a.data_ready().unwrap());
        assert_eq!(
            a.read().unwrap(),
            Acceleration {
                x: 39,
                y: -39,
                z: 998
            }
        );
        bus.done();
    }

    #[test]
    fn range_offsets_and_rate_validation() {
        let bus = I2cScript::new([
            I2cOp::write(ADDR, &[0x31, 0x0B]),
            I2cOp::write(ADDR, &[0x1E, 0x02, 0xFE, 0x00]),
        ]);
        let mut a = Adxl345::new(bus.clone(), ADDR).unwrap();
        a.set_range(Range::G16).unwrap();
        a.set_offsets(2, -2, 0).unwrap();
        assert!(a.set_data_rate(0x10).is_err());
        assert_eq!(a.range(), Range::G16);
        bus.done();
    }

    #[test]
    fn sampler_uses_largest_axis_change() {
        let mut s = Sampler::new(50.0);
        s.update(Acceleration { x: 0, y: 0, z: 1000 });
        assert!(s.update(Acceleration { x: 30, y: -30, z: 1040 }).is_none());
        assert!(s.update(Acceleration { x: 0, y: 0, z: 940 }).is_some());
    }
}
