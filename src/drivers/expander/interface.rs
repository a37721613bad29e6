// Register transport for the MCP23xxx family.
//
// I2C parts take [reg, data..] with a write-read for reads. SPI parts
// prefix an opcode 0100 A2 A1 A0 R/W; the hardware address bits are only
// honoured once IOCON.HAEN is set.

use core::fmt::Debug;

use embedded_hal::i2c::I2c;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::bus::I2cRegisters;
use crate::error::Error;

const SPI_OPCODE: u8 = 0x40;
const SPI_READ: u8 = 0x01;

pub trait RegisterInterface {
    type Error: Debug;

    /// IOCON bits the transport needs set (HAEN on SPI parts).
    const IOCON_BASE: u8 = 0;

    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<Self::Error>>;
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<Self::Error>>;
}

pub struct I2cInterface<I2C> {
    regs: I2cRegisters<I2C>,
}

impl<I2C: I2c> I2cInterface<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<I2C::Error>> {
        if !(0x20..=0x27).contains(&address) {
            return Err(Error::InvalidConfig("MCP230xx address must be 0x20..=0x27"));
        }
        Ok(Self {
            regs: I2cRegisters::new(i2c, address),
        })
    }

    pub fn release(self) -> I2C {
        self.regs.release()
    }
}

impl<I2C: I2c> RegisterInterface for I2cInterface<I2C> {
    type Error = I2C::Error;

    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.regs.write_all(reg, data)
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.regs.read_into(reg, buf)
    }
}

pub struct SpiInterface<SPI> {
    spi: SPI,
    opcode: u8,
}

impl<SPI: SpiDevice> SpiInterface<SPI> {
    pub fn new(spi: SPI, hw_address: u8) -> Result<Self, Error<SPI::Error>> {
        if hw_address > 7 {
            return Err(Error::InvalidConfig("MCP23Sxx hardware address must be 0..=7"));
        }
        Ok(Self {
            spi,
            opcode: SPI_OPCODE | hw_address << 1,
        })
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiDevice> RegisterInterface for SpiInterface<SPI> {
    type Error = SPI::Error;

    const IOCON_BASE: u8 = super::mcp23xxx::iocon::HAEN;

    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(&[self.opcode, reg]), Operation::Write(data)])
            .map_err(Error::Bus)
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[self.opcode | SPI_READ, reg]),
                Operation::Read(buf),
            ])
            .map_err(Error::Bus)
    }
}
