// Sensor drivers. Each implements sampling::Sensor so it can sit
// behind a Sampler / PollSchedule loop.
//
// I2C: MCP9808 (temperature), BH1750 (light), ADXL345 (accel).
// GPIO: HC-SR04 (echo timing), HX711 (bit-banged 24-bit ADC).
// Analog: TMP35/36/37, LM35 via AnalogInput.

pub mod adxl345;
pub mod analog_temp;
pub mod bh1750;
pub mod hcsr04;
pub mod hx711;
pub mod mcp9808;

pub use adxl345::{Acceleration, Adxl345, Range};
pub use analog_temp::{AnalogTemperature, Calibration};
pub use bh1750::{Bh1750, MeasurementMode};
pub use hcsr04::HcSr04;
pub use hx711::{Hx711, Hx711Gain};
pub use mcp9808::{AlertFlags, Mcp9808, Resolution};
