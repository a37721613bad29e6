// MCP23008 / MCP23017 / MCP23S08 / MCP23S17 register-file driver
//
// IOCON.BANK stays 0, so register N of port P lives at N * ports + P and
// the two ports of a x17 can be burst-written low byte first. Direction,
// latch, pull-up, polarity and interrupt config are cached: single-pin
// changes write one byte and never read back.
//
// Pins are numbered 0..8*ports; pin 8 is GPB0 on a x17.

use log::{debug, info};

use super::interface::{I2cInterface, RegisterInterface, SpiInterface};
use crate::error::Error;

mod reg {
    pub const IODIR: u8 = 0;
    pub const IPOL: u8 = 1;
    pub const GPINTEN: u8 = 2;
    pub const DEFVAL: u8 = 3;
    pub const INTCON: u8 = 4;
    pub const IOCON: u8 = 5;
    pub const GPPU: u8 = 6;
    pub const INTF: u8 = 7;
    pub const INTCAP: u8 = 8;
    pub const GPIO: u8 = 9;
    pub const OLAT: u8 = 10;
}

pub(super) mod iocon {
    pub const MIRROR: u8 = 0x40;
    pub const HAEN: u8 = 0x08;
    pub const ODR: u8 = 0x04;
    pub const INTPOL: u8 = 0x02;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ports {
    /// MCP23008 / MCP23S08
    One = 1,
    /// MCP23017 / MCP23S17
    Two = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    /// Any change from the previous pin value.
    Change,
    /// Pin differs from DEFVAL = 1, i.e. goes low.
    Low,
    /// Pin differs from DEFVAL = 0, i.e. goes high.
    High,
}

pub struct Mcp23xxx<IF> {
    iface: IF,
    ports: Ports,
    iocon: u8,
    iodir: u16,
    olat: u16,
    gppu: u16,
    ipol: u16,
    gpinten: u16,
    intcon: u16,
    defval: u16,
}

impl<I2C: embedded_hal::i2c::I2c> Mcp23xxx<I2cInterface<I2C>> {
    pub fn mcp23008(i2c: I2C, address: u8) -> Result<Self, Error<I2C::Error>> {
        Ok(Self::new(I2cInterface::new(i2c, address)?, Ports::One))
    }

    pub fn mcp23017(i2c: I2C, address: u8) -> Result<Self, Error<I2C::Error>> {
        Ok(Self::new(I2cInterface::new(i2c, address)?, Ports::Two))
    }
}

impl<SPI: embedded_hal::spi::SpiDevice> Mcp23xxx<SpiInterface<SPI>> {
    pub fn mcp23s08(spi: SPI, hw_address: u8) -> Result<Self, Error<SPI::Error>> {
        Ok(Self::new(SpiInterface::new(spi, hw_address)?, Ports::One))
    }

    pub fn mcp23s17(spi: SPI, hw_address: u8) -> Result<Self, Error<SPI::Error>> {
        Ok(Self::new(SpiInterface::new(spi, hw_address)?, Ports::Two))
    }
}

impl<IF: RegisterInterface> Mcp23xxx<IF> {
    // caches hold the power-on values until init() writes them
    pub fn new(iface: IF, ports: Ports) -> Self {
        Self {
            iface,
            ports,
            iocon: 0,
            iodir: 0xFFFF,
            olat: 0,
            gppu: 0,
            ipol: 0,
            gpinten: 0,
            intcon: 0,
            defval: 0,
        }
    }

    pub fn ports(&self) -> Ports {
        self.ports
    }

    pub fn pin_count(&self) -> u8 {
        8 * self.ports as u8
    }

    /// All inputs, latches low, pull-ups/inversion/interrupts off,
    /// sequential addressing on.
    pub fn init(&mut self) -> Result<(), Error<IF::Error>> {
        self.iocon = IF::IOCON_BASE;
        self.iface.write_registers(self.addr(reg::IOCON, 0), &[self.iocon])?;

        self.iodir = 0xFFFF;
        self.olat = 0;
        self.gppu = 0;
        self.ipol = 0;
        self.gpinten = 0;
        self.intcon = 0;
        self.defval = 0;
        self.write_all(reg::OLAT, self.olat)?;
        self.write_all(reg::IODIR, self.iodir)?;
        self.write_all(reg::GPPU, self.gppu)?;
        self.write_all(reg::IPOL, self.ipol)?;
        self.write_all(reg::GPINTEN, self.gpinten)?;

        info!("MCP23xxx: {} pins ready", self.pin_count());
        Ok(())
    }

    fn addr(&self, reg: u8, port: u8) -> u8 {
        reg * self.ports as u8 + port
    }

    fn locate(&self, pin: u8) -> Result<(u8, u16), Error<IF::Error>> {
        if pin >= self.pin_count() {
            return Err(Error::InvalidConfig("expander pin out of range"));
        }
        Ok((pin / 8, 1 << pin))
    }

    fn write_port_reg(&mut self, reg: u8, port: u8, cache: u16) -> Result<(), Error<IF::Error>> {
        let value = (cache >> (8 * port)) as u8;
        self.iface.write_registers(self.addr(reg, port), &[value])
    }

    // every port of one register in a single burst
    fn write_all(&mut self, reg: u8, cache: u16) -> Result<(), Error<IF::Error>> {
        let bytes = cache.to_le_bytes();
        let n = self.ports as usize;
        self.iface.write_registers(self.addr(reg, 0), &bytes[..n])
    }

    fn read_all_reg(&mut self, reg: u8) -> Result<u16, Error<IF::Error>> {
        let mut bytes = [0u8; 2];
        let n = self.ports as usize;
        self.iface.read_registers(self.addr(reg, 0), &mut bytes[..n])?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn update_bit(
        &mut self,
        reg: u8,
        pin: u8,
        on: bool,
        select: fn(&mut Self) -> &mut u16,
    ) -> Result<(), Error<IF::Error>> {
        let (port, mask) = self.locate(pin)?;
        let current = *select(self);
        let value = if on { current | mask } else { current & !mask };
        if value == current {
            return Ok(());
        }
        // cache follows the chip: only commit once the write landed
        self.write_port_reg(reg, port, value)?;
        *select(self) = value;
        Ok(())
    }

    pub fn set_direction(&mut self, pin: u8, dir: PinDirection) -> Result<(), Error<IF::Error>> {
        self.update_bit(reg::IODIR, pin, dir == PinDirection::Input, |s| &mut s.iodir)
    }

    pub fn direction(&self, pin: u8) -> PinDirection {
        if self.iodir & (1 << (pin & 15)) != 0 {
            PinDirection::Input
        } else {
            PinDirection::Output
        }
    }

    pub fn set_pull_up(&mut self, pin: u8, on: bool) -> Result<(), Error<IF::Error>> {
        self.update_bit(reg::GPPU, pin, on, |s| &mut s.gppu)
    }

    /// Inverted pins read back as the opposite of the pad level.
    pub fn set_polarity(&mut self, pin: u8, inverted: bool) -> Result<(), Error<IF::Error>> {
        self.update_bit(reg::IPOL, pin, inverted, |s| &mut s.ipol)
    }

    pub fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), Error<IF::Error>> {
        self.update_bit(reg::OLAT, pin, high, |s| &mut s.olat)
    }

    pub fn toggle_pin(&mut self, pin: u8) -> Result<(), Error<IF::Error>> {
        let high = self.is_set_high(pin)?;
        self.write_pin(pin, !high)
    }

    /// Latched output level, from the cache.
    pub fn is_set_high(&self, pin: u8) -> Result<bool, Error<IF::Error>> {
        let (_, mask) = self.locate(pin)?;
        Ok(self.olat & mask != 0)
    }

    pub fn write_port(&mut self, port: u8, value: u8) -> Result<(), Error<IF::Error>> {
        if port >= self.ports as u8 {
            return Err(Error::InvalidConfig("expander port out of range"));
        }
        let shift = 8 * port;
        let olat = (self.olat & !(0xFF << shift)) | (value as u16) << shift;
        self.write_port_reg(reg::OLAT, port, olat)?;
        self.olat = olat;
        Ok(())
    }

    pub fn write_all_pins(&mut self, value: u16) -> Result<(), Error<IF::Error>> {
        self.write_all(reg::OLAT, value)?;
        self.olat = value;
        Ok(())
    }

    pub fn read_pin(&mut self, pin: u8) -> Result<bool, Error<IF::Error>> {
        let (port, _) = self.locate(pin)?;
        let value = self.read_port(port)?;
        Ok(value & (1 << (pin % 8)) != 0)
    }

    pub fn read_port(&mut self, port: u8) -> Result<u8, Error<IF::Error>> {
        if port >= self.ports as u8 {
            return Err(Error::InvalidConfig("expander port out of range"));
        }
        let mut buf = [0u8; 1];
        self.iface.read_registers(self.addr(reg::GPIO, port), &mut buf)?;
        Ok(buf[0])
    }

    /// GPIO of every port, port A in the low byte.
    pub fn read_all(&mut self) -> Result<u16, Error<IF::Error>> {
        self.read_all_reg(reg::GPIO)
    }

    pub fn enable_interrupt(&mut self, pin: u8, mode: InterruptMode) -> Result<(), Error<IF::Error>> {
        let (port, mask) = self.locate(pin)?;
        let (compare, defval_high) = match mode {
            InterruptMode::Change => (false, false),
            InterruptMode::Low => (true, true),
            InterruptMode::High => (true, false),
        };
        let intcon = if compare {
            let defval = if defval_high {
                self.defval | mask
            } else {
                self.defval & !mask
            };
            self.write_port_reg(reg::DEFVAL, port, defval)?;
            self.defval = defval;
            self.intcon | mask
        } else {
            self.intcon & !mask
        };
        self.write_port_reg(reg::INTCON, port, intcon)?;
        self.intcon = intcon;
        let gpinten = self.gpinten | mask;
        self.write_port_reg(reg::GPINTEN, port, gpinten)?;
        self.gpinten = gpinten;
        debug!("MCP23xxx: pin {} interrupt {:?}", pin, mode);
        Ok(())
    }

    pub fn disable_interrupt(&mut self, pin: u8) -> Result<(), Error<IF::Error>> {
        self.update_bit(reg::GPINTEN, pin, false, |s| &mut s.gpinten)
    }

    fn write_iocon(&mut self, clear: u8, set: u8) -> Result<(), Error<IF::Error>> {
        let iocon = (self.iocon & !clear) | set;
        self.iface.write_registers(self.addr(reg::IOCON, 0), &[iocon])?;
        self.iocon = iocon;
        Ok(())
    }

    /// Tie INTA and INTB together (x17 only has two INT lines).
    pub fn set_interrupt_mirror(&mut self, mirror: bool) -> Result<(), Error<IF::Error>> {
        let set = if mirror { iocon::MIRROR } else { 0 };
        self.write_iocon(iocon::MIRROR, set)
    }

    /// INT pin drive: open-drain overrides the active level.
    pub fn set_interrupt_output(
        &mut self,
        open_drain: bool,
        active_high: bool,
    ) -> Result<(), Error<IF::Error>> {
        let mut set = 0;
        if open_drain {
            set |= iocon::ODR;
        }
        if active_high {
            set |= iocon::INTPOL;
        }
        self.write_iocon(iocon::ODR | iocon::INTPOL, set)
    }

    /// Pins that raised the pending interrupt.
    pub fn interrupt_flags(&mut self) -> Result<u16, Error<IF::Error>> {
        self.read_all_reg(reg::INTF)
    }

    /// Pin levels latched at interrupt time; reading clears the interrupt.
    pub fn interrupt_capture(&mut self) -> Result<u16, Error<IF::Error>> {
        self.read_all_reg(reg::INTCAP)
    }

    pub fn release(self) -> IF {
        self.iface
    }
}
