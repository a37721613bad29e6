// MCP23xxx GPIO expanders.
//
// One register-file driver (mcp23xxx) over a RegisterInterface, so the
// I2C (MCP23008/MCP23017) and SPI (MCP23S08/MCP23S17) parts share every
// operation. ExpanderPin turns single pins into embedded-hal pins.

pub mod interface;
pub mod mcp23xxx;
pub mod pin;

pub use interface::{I2cInterface, RegisterInterface, SpiInterface};
pub use mcp23xxx::{InterruptMode, Mcp23xxx, PinDirection, Ports};
pub use pin::ExpanderPin;
