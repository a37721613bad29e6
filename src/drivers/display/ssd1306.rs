// SSD1306 OLED driver, 4-wire SPI (DC + RST), 128x64 or 128x32
//
// Whole frame kept in RAM in the controller's page layout: byte
// x + page*128 holds rows page*8..page*8+7 of column x, LSB on top.
// Drawing only touches the buffer; flush() streams it in one burst
// with horizontal addressing, and only when something changed.
//
// Rotation is done in software while drawing, the panel is always
// scanned the same way.

use core::convert::Infallible;

use embedded_graphics_core::Pixel;
use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{OriginDimensions, Size};
use embedded_graphics_core::pixelcolor::BinaryColor;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use log::info;

use crate::error::{Error, PinResultExt};

pub const WIDTH: u16 = 128;
const BUF_SIZE: usize = WIDTH as usize * 64 / 8;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplaySize {
    #[default]
    W128H64,
    W128H32,
}

impl DisplaySize {
    pub const fn height(self) -> u16 {
        match self {
            DisplaySize::W128H64 => 64,
            DisplaySize::W128H32 => 32,
        }
    }

    const fn pages(self) -> u8 {
        (self.height() / 8) as u8
    }

    // COM pins: alternative config on 64-row panels, sequential on 32
    const fn com_pins(self) -> u8 {
        match self {
            DisplaySize::W128H64 => 0x12,
            DisplaySize::W128H32 => 0x02,
        }
    }
}

mod cmd {
    pub const SET_CONTRAST: u8 = 0x81;
    pub const ENTIRE_ON_RESUME: u8 = 0xA4;
    pub const NORMAL: u8 = 0xA6;
    pub const INVERT: u8 = 0xA7;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const DISPLAY_OFFSET: u8 = 0xD3;
    pub const COM_PINS: u8 = 0xDA;
    pub const VCOM_DETECT: u8 = 0xDB;
    pub const CLOCK_DIV: u8 = 0xD5;
    pub const PRECHARGE: u8 = 0xD9;
    pub const MULTIPLEX: u8 = 0xA8;
    pub const START_LINE: u8 = 0x40;
    pub const MEMORY_MODE: u8 = 0x20;
    pub const COLUMN_ADDR: u8 = 0x21;
    pub const PAGE_ADDR: u8 = 0x22;
    pub const SEG_REMAP: u8 = 0xA1;
    pub const COM_SCAN_DEC: u8 = 0xC8;
    pub const CHARGE_PUMP: u8 = 0x8D;
}

pub struct Ssd1306<SPI, DC, RST> {
    spi: SPI,
    dc: DC,
    rst: RST,
    size: DisplaySize,
    rotation: Rotation,
    buffer: [u8; BUF_SIZE],
    dirty: bool,
}

impl<SPI, DC, RST> Ssd1306<SPI, DC, RST>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, size: DisplaySize) -> Self {
        Self {
            spi,
            dc,
            rst,
            size,
            rotation: Rotation::Deg0,
            buffer: [0; BUF_SIZE],
            dirty: false,
        }
    }

    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<SPI::Error>> {
        self.rst.set_high().pin_err()?;
        delay.delay_ms(1);
        self.rst.set_low().pin_err()?;
        delay.delay_ms(10);
        self.rst.set_high().pin_err()?;
        delay.delay_ms(10);
        Ok(())
    }

    /// Hardware reset, init sequence, blank frame, panel on.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<SPI::Error>> {
        self.reset(delay)?;

        let h = self.size.height() as u8;
        self.send_commands(&[
            cmd::DISPLAY_OFF,
            cmd::CLOCK_DIV,
            0x80,
            cmd::MULTIPLEX,
            h - 1,
            cmd::DISPLAY_OFFSET,
            0x00,
            cmd::START_LINE,
            cmd::CHARGE_PUMP,
            0x14, // internal VCC
            cmd::MEMORY_MODE,
            0x00, // horizontal
            cmd::SEG_REMAP,
            cmd::COM_SCAN_DEC,
            cmd::COM_PINS,
            self.size.com_pins(),
            cmd::SET_CONTRAST,
            0xCF,
            cmd::PRECHARGE,
            0xF1,
            cmd::VCOM_DETECT,
            0x40,
            cmd::ENTIRE_ON_RESUME,
            cmd::NORMAL,
        ])?;

        self.buffer.fill(0);
        self.dirty = true;
        self.flush()?;
        self.send_commands(&[cmd::DISPLAY_ON])?;
        info!("SSD1306: 128x{} ready", h);
        Ok(())
    }

    fn send_commands(&mut self, cmds: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.dc.set_low().pin_err()?;
        self.spi.write(cmds).map_err(Error::Bus)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.dc.set_high().pin_err()?;
        self.spi.write(data).map_err(Error::Bus)
    }

    /// Push the frame buffer if anything was drawn since the last flush.
    pub fn flush(&mut self) -> Result<(), Error<SPI::Error>> {
        if !self.dirty {
            return Ok(());
        }
        let pages = self.size.pages();
        self.send_commands(&[
            cmd::COLUMN_ADDR,
            0,
            (WIDTH - 1) as u8,
            cmd::PAGE_ADDR,
            0,
            pages - 1,
        ])?;
        let len = WIDTH as usize * pages as usize;
        self.dc.set_high().pin_err()?;
        self.spi.write(&self.buffer[..len]).map_err(Error::Bus)?;
        self.dirty = false;
        Ok(())
    }

    pub fn set_contrast(&mut self, level: u8) -> Result<(), Error<SPI::Error>> {
        self.send_commands(&[cmd::SET_CONTRAST, level])
    }

    pub fn set_inverted(&mut self, inverted: bool) -> Result<(), Error<SPI::Error>> {
        let c = if inverted { cmd::INVERT } else { cmd::NORMAL };
        self.send_commands(&[c])
    }

    pub fn set_display_on(&mut self, on: bool) -> Result<(), Error<SPI::Error>> {
        let c = if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF };
        self.send_commands(&[c])
    }

    /// Raw page-layout bytes, bypassing the frame buffer.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.send_data(data)
    }

    pub fn release(self) -> (SPI, DC, RST) {
        (self.spi, self.dc, self.rst)
    }
}

impl<SPI, DC, RST> Ssd1306<SPI, DC, RST> {
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer[..WIDTH as usize * self.size.pages() as usize]
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.fill(0);
        self.dirty = true;
    }

    fn height(&self) -> u16 {
        self.size.height()
    }

    // logical (rotated) -> panel coordinates
    fn to_physical(&self, lx: u16, ly: u16) -> (u16, u16) {
        let h = self.height();
        match self.rotation {
            Rotation::Deg0 => (lx, ly),
            Rotation::Deg90 => (WIDTH - 1 - ly, lx),
            Rotation::Deg180 => (WIDTH - 1 - lx, h - 1 - ly),
            Rotation::Deg270 => (ly, h - 1 - lx),
        }
    }

    fn set_pixel_physical(&mut self, px: u16, py: u16, on: bool) {
        let idx = px as usize + (py as usize / 8) * WIDTH as usize;
        let bit = 1 << (py % 8);
        if on {
            self.buffer[idx] |= bit;
        } else {
            self.buffer[idx] &= !bit;
        }
    }

    /// Logical pixel state; false outside the panel.
    pub fn pixel(&self, x: u16, y: u16) -> bool {
        let size = self.size();
        if x as u32 >= size.width || y as u32 >= size.height {
            return false;
        }
        let (px, py) = self.to_physical(x, y);
        self.buffer[px as usize + (py as usize / 8) * WIDTH as usize] & (1 << (py % 8)) != 0
    }
}

impl<SPI, DC, RST> OriginDimensions for Ssd1306<SPI, DC, RST> {
    fn size(&self) -> Size {
        let h = self.height() as u32;
        match self.rotation {
            Rotation::Deg0 | Rotation::Deg180 => Size::new(WIDTH as u32, h),
            Rotation::Deg90 | Rotation::Deg270 => Size::new(h, WIDTH as u32),
        }
    }
}

impl<SPI, DC, RST> DrawTarget for Ssd1306<SPI, DC, RST> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let size = self.size();
        let log_w = size.width as i32;
        let log_h = size.height as i32;

        for Pixel(coord, color) in pixels {
            if coord.x < 0 || coord.x >= log_w || coord.y < 0 || coord.y >= log_h {
                continue;
            }
            let (px, py) = self.to_physical(coord.x as u16, coord.y as u16);
            self.set_pixel_physical(px, py, color == BinaryColor::On);
            self.dirty = true;
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color == BinaryColor::On { 0xFF } else { 0x00 };
        self.buffer.fill(fill);
        self.dirty = true;
        Ok(())
    }
}
