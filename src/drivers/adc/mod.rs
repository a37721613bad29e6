// Analog-to-digital converters.
//
// ADS1x15: I2C delta-sigma, programmable gain, single-shot with OS polling
// or ALERT/RDY pin. MCP3xxx: SPI SAR converters, one frame per sample.
// Both hand out per-channel adapters implementing AnalogInput.

pub mod ads1x15;
pub mod mcp3xxx;

pub use ads1x15::{Ads1x15, AdsChannel, Channel, Gain, Variant};
pub use mcp3xxx::{InputMode, Mcp3xxx, Mcp3xxxChannel, Model};
