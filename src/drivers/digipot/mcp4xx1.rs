// MCP41x1 / MCP42x1 SPI digital potentiometers (MCP4131/4151/4231/4251)
//
// 16-bit command: AAAA CC DD DDDD DDDD (address, command, 10 data bits).
// Increment/decrement are the 8-bit short form. Wiper positions are
// cached so inc/dec and resistance() don't need a read back.

use embedded_hal::spi::SpiDevice;
use log::{debug, info};

use crate::error::Error;

mod mem {
    pub const WIPER0: u8 = 0x00;
    pub const WIPER1: u8 = 0x01;
    pub const TCON: u8 = 0x04;
    pub const STATUS: u8 = 0x05;
}

mod op {
    pub const WRITE: u8 = 0b00;
    pub const INCREMENT: u8 = 0b01;
    pub const DECREMENT: u8 = 0b10;
    pub const READ: u8 = 0b11;
}

// GCEN + all terminals connected
const TCON_DEFAULT: u16 = 0x1FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiper {
    W0,
    W1,
}

impl Wiper {
    const fn index(self) -> usize {
        self as usize
    }

    const fn address(self) -> u8 {
        match self {
            Wiper::W0 => mem::WIPER0,
            Wiper::W1 => mem::WIPER1,
        }
    }

    // R0HW/R0A/R0W/R0B in bits 3:0, R1x in bits 7:4
    const fn tcon_mask(self) -> u16 {
        match self {
            Wiper::W0 => 0x00F,
            Wiper::W1 => 0x0F0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotConfig {
    /// Wiper positions: 129 on 7-bit parts, 257 on 8-bit parts.
    pub steps: u16,
    /// End-to-end resistance Rab.
    pub resistance_ohms: u32,
    pub wiper_ohms: u32,
    pub wipers: u8,
}

impl PotConfig {
    pub const fn mcp4131(resistance_ohms: u32) -> Self {
        Self::new(129, resistance_ohms, 1)
    }

    pub const fn mcp4151(resistance_ohms: u32) -> Self {
        Self::new(257, resistance_ohms, 1)
    }

    pub const fn mcp4231(resistance_ohms: u32) -> Self {
        Self::new(129, resistance_ohms, 2)
    }

    pub const fn mcp4251(resistance_ohms: u32) -> Self {
        Self::new(257, resistance_ohms, 2)
    }

    const fn new(steps: u16, resistance_ohms: u32, wipers: u8) -> Self {
        Self {
            steps,
            resistance_ohms,
            wiper_ohms: 75,
            wipers,
        }
    }

    pub const fn max_step(&self) -> u16 {
        self.steps - 1
    }
}

impl Default for PotConfig {
    fn default() -> Self {
        Self::mcp4131(10_000)
    }
}

pub struct Mcp4xx1<SPI> {
    spi: SPI,
    config: PotConfig,
    positions: [u16; 2],
    tcon: u16,
}

impl<SPI: SpiDevice> Mcp4xx1<SPI> {
    pub fn new(spi: SPI, config: PotConfig) -> Result<Self, Error<SPI::Error>> {
        if !matches!(config.steps, 129 | 257) {
            return Err(Error::InvalidConfig("step count must be 129 or 257"));
        }
        if !matches!(config.wipers, 1 | 2) {
            return Err(Error::InvalidConfig("wiper count must be 1 or 2"));
        }
        if config.resistance_ohms == 0 {
            return Err(Error::InvalidConfig("resistance must be non-zero"));
        }
        // power-on reset loads mid-scale
        let mid = config.max_step() / 2;
        Ok(Self {
            spi,
            config,
            positions: [mid; 2],
            tcon: TCON_DEFAULT,
        })
    }

    pub fn config(&self) -> &PotConfig {
        &self.config
    }

    fn check(&self, wiper: Wiper) -> Result<(), Error<SPI::Error>> {
        if wiper.index() >= self.config.wipers as usize {
            return Err(Error::InvalidConfig("wiper not present on this part"));
        }
        Ok(())
    }

    fn write_word(&mut self, addr: u8, data: u16) -> Result<(), Error<SPI::Error>> {
        let frame = [
            addr << 4 | op::WRITE << 2 | ((data >> 8) & 0x03) as u8,
            data as u8,
        ];
        self.spi.write(&frame).map_err(Error::Bus)
    }

    fn read_word(&mut self, addr: u8) -> Result<u16, Error<SPI::Error>> {
        let mut frame = [addr << 4 | op::READ << 2 | 0x03, 0xFF];
        self.spi.transfer_in_place(&mut frame).map_err(Error::Bus)?;
        // D8 in bit 0 of the first byte
        Ok(((frame[0] & 0x01) as u16) << 8 | frame[1] as u16)
    }

    pub fn set_wiper(&mut self, wiper: Wiper, step: u16) -> Result<(), Error<SPI::Error>> {
        self.check(wiper)?;
        if step > self.config.max_step() {
            return Err(Error::InvalidConfig("wiper step out of range"));
        }
        self.write_word(wiper.address(), step)?;
        self.positions[wiper.index()] = step;
        debug!("MCP4xx1 wiper {:?} -> {}", wiper, step);
        Ok(())
    }

    /// Read the wiper register back from the chip.
    pub fn wiper(&mut self, wiper: Wiper) -> Result<u16, Error<SPI::Error>> {
        self.check(wiper)?;
        let step = self.read_word(wiper.address())?;
        self.positions[wiper.index()] = step;
        Ok(step)
    }

    pub fn cached_wiper(&self, wiper: Wiper) -> u16 {
        self.positions[wiper.index()]
    }

    /// One step toward terminal A; stays put at full scale.
    pub fn increment(&mut self, wiper: Wiper) -> Result<(), Error<SPI::Error>> {
        self.check(wiper)?;
        self.spi
            .write(&[wiper.address() << 4 | op::INCREMENT << 2])
            .map_err(Error::Bus)?;
        let p = &mut self.positions[wiper.index()];
        *p = (*p + 1).min(self.config.max_step());
        Ok(())
    }

    pub fn decrement(&mut self, wiper: Wiper) -> Result<(), Error<SPI::Error>> {
        self.check(wiper)?;
        self.spi
            .write(&[wiper.address() << 4 | op::DECREMENT << 2])
            .map_err(Error::Bus)?;
        let p = &mut self.positions[wiper.index()];
        *p = p.saturating_sub(1);
        Ok(())
    }

    pub fn step_for_resistance(&self, ohms: u32) -> u16 {
        let c = &self.config;
        let span = ohms.saturating_sub(c.wiper_ohms) as u64;
        let max = c.max_step() as u64;
        let step = (span * max + c.resistance_ohms as u64 / 2) / c.resistance_ohms as u64;
        step.min(max) as u16
    }

    pub fn resistance_at(&self, step: u16) -> u32 {
        let c = &self.config;
        (c.resistance_ohms as u64 * step as u64 / c.max_step() as u64) as u32 + c.wiper_ohms
    }

    /// Nearest step giving `ohms` between wiper and terminal B, clamped.
    pub fn set_resistance(&mut self, wiper: Wiper, ohms: u32) -> Result<u32, Error<SPI::Error>> {
        let step = self.step_for_resistance(ohms);
        self.set_wiper(wiper, step)?;
        Ok(self.resistance_at(step))
    }

    /// Wiper-to-B resistance at the cached position.
    pub fn resistance(&self, wiper: Wiper) -> u32 {
        self.resistance_at(self.cached_wiper(wiper))
    }

    /// Connect or disconnect all terminals of one pot via TCON.
    pub fn set_terminals(&mut self, wiper: Wiper, connected: bool) -> Result<(), Error<SPI::Error>> {
        self.check(wiper)?;
        let tcon = if connected {
            self.tcon | wiper.tcon_mask()
        } else {
            self.tcon & !wiper.tcon_mask()
        };
        self.write_word(mem::TCON, tcon)?;
        self.tcon = tcon;
        info!("MCP4xx1 TCON = {:#05x}", tcon);
        Ok(())
    }

    /// STATUS register: bit 1 = SHDN pin asserted, bit 0 = WP asserted.
    pub fn status(&mut self) -> Result<u16, Error<SPI::Error>> {
        self.read_word(mem::STATUS)
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SpiRecorder;
    use proptest::prelude::*;

    #[test]
    fn write_frames_carry_high_data_bits() {
        let spi = SpiRecorder::new();
        let mut pot = Mcp4xx1::new(spi.clone(), PotConfig::mcp4251(10_000)).unwrap();
        pot.set_wiper(Wiper::W1, 256).unwrap();
        pot.set_wiper(Wiper::W0, 0x42).unwrap();
        assert_eq!(spi.frames(), [[0x11, 0x00], [0x00, 0x42]]);
        assert!(pot.set_wiper(Wiper::W0, 257).is_err());
    }

    #[test]
    fn single_wiper_part_rejects_w1() {
        let spi = SpiRecorder::new();
        let mut pot = Mcp4xx1::new(spi.clone(), PotConfig::mcp4131(5_000)).unwrap();
        assert!(matches!(
            pot.set_wiper(Wiper::W1, 1),
            Err(Error::InvalidConfig(_))
        ));
        assert!(spi.frames().is_empty());
    }

    #[test]
    fn inc_dec_saturate_in_cache() {
        let spi = SpiRecorder::new();
        let mut pot = Mcp4xx1::new(spi.clone(), PotConfig::mcp4131(10_000)).unwrap();
        assert_eq!(pot.cached_wiper(Wiper::W0), 64);
        pot.set_wiper(Wiper::W0, 128).unwrap();
        pot.increment(Wiper::W0).unwrap();
        assert_eq!(pot.cached_wiper(Wiper::W0), 128);
        pot.set_wiper(Wiper::W0, 0).unwrap();
        pot.decrement(Wiper::W0).unwrap();
        assert_eq!(pot.cached_wiper(Wiper::W0), 0);
        let frames = spi.frames();
        assert_eq!(frames[1], [0x04]);
        assert_eq!(frames[3], [0x08]);
    }

    #[test]
    fn read_back_updates_cache() {
        let spi = SpiRecorder::new();
        spi.respond(&[0xFF, 0x00]);
        let mut pot = Mcp4xx1::new(spi.clone(), PotConfig::mcp4151(50_000)).unwrap();
        assert_eq!(pot.wiper(Wiper::W0).unwrap(), 256);
        assert_eq!(pot.cached_wiper(Wiper::W0), 256);
        assert_eq!(spi.frames(), [[0x0F, 0xFF]]);
    }

    #[test]
    fn status_reads_register_5() {
        let spi = SpiRecorder::new();
        spi.respond(&[0xFF, 0xF2]);
        let mut pot = Mcp4xx1::new(spi.clone(), PotConfig::mcp4131(10_000)).unwrap();
        let status = pot.status().unwrap();
        assert_eq!(status, 0x1F2);
        // SHDN asserted, write protect off
        assert_eq!(status & 0x3, 0x2);
        assert_eq!(spi.frames(), [[0x5F, 0xFF]]);
        // wiper cache untouched by a status read
        assert_eq!(pot.cached_wiper(Wiper::W0), 64);
    }

    #[test]
    fn terminals_toggle_tcon_nibble() {
        let spi = SpiRecorder::new();
        let mut pot = Mcp4xx1::new(spi.clone(), PotConfig::mcp4231(10_000)).unwrap();
        pot.set_terminals(Wiper::W1, false).unwrap();
        pot.set_terminals(Wiper::W1, true).unwrap();
        assert_eq!(spi.frames(), [[0x41, 0x0F], [0x41, 0xFF]]);
    }

    #[test]
    fn resistance_endpoints() {
        let pot = Mcp4xx1::new(SpiRecorder::new(), PotConfig::mcp4131(10_000)).unwrap();
        assert_eq!(pot.resistance_at(0), 75);
        assert_eq!(pot.resistance_at(128), 10_075);
        assert_eq!(pot.step_for_resistance(0), 0);
        assert_eq!(pot.step_for_resistance(1_000_000), 128);
    }

    proptest! {
        #[test]
        fn nearest_step_within_half_step(ohms in 75u32..=10_075) {
            let pot = Mcp4xx1::new(SpiRecorder::new(), PotConfig::mcp4131(10_000)).unwrap();
            let got = pot.resistance_at(pot.step_for_resistance(ohms));
            // 10k / 128 steps = 78.1 ohm per step
            prop_assert!((got as i64 - ohms as i64).abs() <= 40);
        }
    }
}
