// Digital potentiometers.

pub mod mcp4xx1;

pub use mcp4xx1::{Mcp4xx1, PotConfig, Wiper};
