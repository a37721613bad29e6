// Hardware drivers, chip-level and protocol-level, board-independent.
//
// Each module is reusable across boards; only pin assignments and bus
// wiring are board-specific. Bus-attached chips take an embedded-hal
// I2c/SpiDevice by value, so sharing a bus is the caller's choice
// (embedded-hal-bus devices, critical-section mutexes, ...).

pub mod adc;
pub mod battery;
pub mod digipot;
pub mod display;
pub mod expander;
pub mod input;
pub mod motor;
pub mod pwm;
pub mod sensor;
pub mod servo;
