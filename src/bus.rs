// Register access helpers for I2C chips.
//
// Every register-mapped chip in drivers/ goes through this: one 7-bit
// address, register pointer written first, data after. Multi-byte
// registers come in either byte order depending on the chip.

use embedded_hal::i2c::I2c;

use crate::error::Error;

// longest burst write any driver issues (register + payload)
const MAX_WRITE: usize = 16;

pub struct I2cRegisters<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cRegisters<I2C> {
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn read_u8(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.read_into(reg, &mut buf)?;
        Ok(buf[0])
    }

    pub fn write_u8(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(Error::Bus)
    }

    pub fn read_u16_be(&mut self, reg: u8) -> Result<u16, Error<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.read_into(reg, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_u16_le(&mut self, reg: u8) -> Result<u16, Error<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.read_into(reg, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn write_u16_be(&mut self, reg: u8, value: u16) -> Result<(), Error<I2C::Error>> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[reg, hi, lo])
            .map_err(Error::Bus)
    }

    pub fn read_into(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .map_err(Error::Bus)
    }

    /// Burst write starting at `reg`; the chip auto-increments.
    pub fn write_all(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        if data.len() >= MAX_WRITE {
            return Err(Error::InvalidConfig("burst write too long"));
        }
        let mut frame = [0u8; MAX_WRITE];
        frame[0] = reg;
        frame[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(self.address, &frame[..=data.len()])
            .map_err(Error::Bus)
    }

    /// Read-modify-write: clear `clear` bits, then set `set` bits.
    pub fn modify_u8(&mut self, reg: u8, clear: u8, set: u8) -> Result<u8, Error<I2C::Error>> {
        let old = self.read_u8(reg)?;
        let new = (old & !clear) | set;
        if new != old {
            self.write_u8(reg, new)?;
        }
        Ok(new)
    }

    /// Bare opcode with no register pointer (command-style chips).
    pub fn command(&mut self, opcode: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c.write(self.address, &[opcode]).map_err(Error::Bus)
    }

    /// Plain read with no register pointer.
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c.read(self.address, buf).map_err(Error::Bus)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}
