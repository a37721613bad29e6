// User input: quadrature rotary encoders, debounced buttons, and
// buttons multiplexed onto one ADC pin through a resistor ladder.
//
// Debouncing is timestamp-driven: callers poll with a wrapping
// millisecond clock, nothing here owns a timer.

pub mod button;
pub mod ladder;
pub mod rotary;

pub use button::{Debouncer, Event, PushButton, Timing};
pub use ladder::{ResistorLadder, Threshold, decode_ladder};
pub use rotary::{Quadrature, RotaryEncoder, SharedEncoder, StepsPerDetent, Turn};
