// MCP3004/3008 (10-bit) and MCP3204/3208 (12-bit) SPI SAR ADCs
//
// One full-duplex 3-byte frame per conversion. The start bit and the
// SGL/DIFF + channel field sit at different offsets in the two families,
// so the result bits land differently in rx[1..3].

use embedded_hal::spi::SpiDevice;
use log::debug;

use crate::analog::AnalogInput;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Mcp3004,
    Mcp3008,
    Mcp3204,
    Mcp3208,
}

impl Model {
    pub const fn channels(self) -> u8 {
        match self {
            Model::Mcp3004 | Model::Mcp3204 => 4,
            Model::Mcp3008 | Model::Mcp3208 => 8,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Model::Mcp3004 | Model::Mcp3008 => 10,
            Model::Mcp3204 | Model::Mcp3208 => 12,
        }
    }

    pub const fn max_code(self) -> u16 {
        (1 << self.bits()) - 1
    }
}

/// Differential reads take the pair index in place of the channel:
/// pair 0 is CH0+/CH1-, pair 1 is CH1+/CH0-, and so on per datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    SingleEnded,
    Differential,
}

pub struct Mcp3xxx<SPI> {
    spi: SPI,
    model: Model,
    vref_mv: u16,
}

impl<SPI: SpiDevice> Mcp3xxx<SPI> {
    pub fn new(spi: SPI, model: Model, vref_mv: u16) -> Result<Self, Error<SPI::Error>> {
        if vref_mv == 0 {
            return Err(Error::InvalidConfig("reference voltage must be non-zero"));
        }
        Ok(Self {
            spi,
            model,
            vref_mv,
        })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn vref_mv(&self) -> u16 {
        self.vref_mv
    }

    fn frame(&self, channel: u8, mode: InputMode) -> [u8; 3] {
        let single = (mode == InputMode::SingleEnded) as u8;
        match self.model.bits() {
            10 => [0x01, single << 7 | channel << 4, 0x00],
            _ => [0x04 | single << 1 | channel >> 2, (channel & 0x03) << 6, 0x00],
        }
    }

    pub fn read(&mut self, channel: u8, mode: InputMode) -> Result<u16, Error<SPI::Error>> {
        if channel >= self.model.channels() {
            return Err(Error::InvalidConfig("MCP3xxx channel out of range"));
        }
        let mut buf = self.frame(channel, mode);
        self.spi.transfer_in_place(&mut buf).map_err(Error::Bus)?;

        let high_mask = if self.model.bits() == 10 { 0x03 } else { 0x0F };
        let code = ((buf[1] & high_mask) as u16) << 8 | buf[2] as u16;
        debug!("MCP3xxx ch{} = {}", channel, code);
        Ok(code)
    }

    pub fn code_to_mv(&self, code: u16) -> u16 {
        (code as u32 * self.vref_mv as u32 / (self.model.max_code() as u32 + 1)) as u16
    }

    pub fn read_mv(&mut self, channel: u8) -> Result<u16, Error<SPI::Error>> {
        let code = self.read(channel, InputMode::SingleEnded)?;
        Ok(self.code_to_mv(code))
    }

    /// Borrow one single-ended input as an `AnalogInput`.
    pub fn channel(&mut self, channel: u8) -> Result<Mcp3xxxChannel<'_, SPI>, Error<SPI::Error>> {
        if channel >= self.model.channels() {
            return Err(Error::InvalidConfig("MCP3xxx channel out of range"));
        }
        Ok(Mcp3xxxChannel { adc: self, channel })
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

pub struct Mcp3xxxChannel<'a, SPI> {
    adc: &'a mut Mcp3xxx<SPI>,
    channel: u8,
}

impl<SPI: SpiDevice> AnalogInput for Mcp3xxxChannel<'_, SPI> {
    type Error = Error<SPI::Error>;

    fn read_mv(&mut self) -> nb::Result<u16, Self::Error> {
        Ok(self.adc.read_mv(self.channel)?)
    }
}
