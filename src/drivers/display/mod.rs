// Displays: TM1637 4/6-digit LED (bit-banged), SSD1306 OLED (SPI).

pub mod segments;
pub mod ssd1306;
pub mod tm1637;

pub use ssd1306::{DisplaySize, Rotation, Ssd1306};
pub use tm1637::Tm1637;
