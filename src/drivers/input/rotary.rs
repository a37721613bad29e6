// Quadrature rotary encoder decoding
//
// State is the 2-bit Gray code AB (A = bit 1). A valid step changes one
// bit; the table maps prev<<2 | new to +1 (clockwise), -1, or 0 for no
// change and for double-bit jumps (missed edge, direction unknown).
//
//   CW:  00 -> 10 -> 11 -> 01 -> 00
//   CCW: 00 -> 01 -> 11 -> 10 -> 00
//
// Detented encoders produce 1, 2 or 4 transitions per click; steps are
// accumulated until a full detent before position moves.

use embedded_hal::digital::InputPin;

use crate::error::{Error, PinResultExt};
use crate::sampling::Shared;

#[rustfmt::skip]
const TRANSITIONS: [i8; 16] = [
//  new: 00  01  10  11
         0, -1,  1,  0, // prev 00
         1,  0,  0, -1, // prev 01
        -1,  0,  0,  1, // prev 10
         0,  1, -1,  0, // prev 11
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Turn {
    #[default]
    None,
    Clockwise,
    CounterClockwise,
}

impl Turn {
    pub const fn step(self) -> i32 {
        match self {
            Turn::None => 0,
            Turn::Clockwise => 1,
            Turn::CounterClockwise => -1,
        }
    }
}

#[inline]
const fn ab(a: bool, b: bool) -> u8 {
    (a as u8) << 1 | b as u8
}

/// Direction of one AB transition.
pub const fn decode(prev: u8, new: u8) -> Turn {
    match TRANSITIONS[((prev & 3) << 2 | (new & 3)) as usize] {
        1 => Turn::Clockwise,
        -1 => Turn::CounterClockwise,
        _ => Turn::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepsPerDetent {
    #[default]
    One = 1,
    Two = 2,
    Four = 4,
}

/// Decoder state without pins, so it can live in an interrupt-shared cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadrature {
    state: u8,
    partial: i8,
    per_detent: i8,
    position: i32,
    delta: i32,
    last: Turn,
}

impl Quadrature {
    pub const fn new(per_detent: StepsPerDetent) -> Self {
        Self {
            state: 0,
            partial: 0,
            per_detent: per_detent as i8,
            position: 0,
            delta: 0,
            last: Turn::None,
        }
    }

    /// Seed the AB state without counting a step.
    pub fn set_levels(&mut self, a: bool, b: bool) {
        self.state = ab(a, b);
        self.partial = 0;
    }

    /// Feed the current A/B levels; returns a turn once per full detent.
    pub fn update(&mut self, a: bool, b: bool) -> Turn {
        let new = ab(a, b);
        let step = decode(self.state, new).step() as i8;
        self.state = new;
        if step == 0 {
            return Turn::None;
        }

        self.partial += step;
        let turn = if self.partial >= self.per_detent {
            Turn::Clockwise
        } else if self.partial <= -self.per_detent {
            Turn::CounterClockwise
        } else {
            return Turn::None;
        };
        self.partial = 0;
        self.position += turn.step();
        self.delta += turn.step();
        self.last = turn;
        turn
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn last_turn(&self) -> Turn {
        self.last
    }

    /// Detents since the previous call.
    pub fn take_delta(&mut self) -> i32 {
        core::mem::take(&mut self.delta)
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.delta = 0;
        self.partial = 0;
        self.last = Turn::None;
    }
}

impl Default for Quadrature {
    fn default() -> Self {
        Self::new(StepsPerDetent::default())
    }
}

/// Encoder on two input pins, polled or fed from edge interrupts.
pub struct RotaryEncoder<A, B> {
    a: A,
    b: B,
    quad: Quadrature,
}

impl<A: InputPin, B: InputPin> RotaryEncoder<A, B> {
    pub fn new(mut a: A, mut b: B, per_detent: StepsPerDetent) -> Result<Self, Error> {
        let mut quad = Quadrature::new(per_detent);
        quad.set_levels(a.is_high().pin_err()?, b.is_high().pin_err()?);
        Ok(Self { a, b, quad })
    }

    pub fn poll(&mut self) -> Result<Turn, Error> {
        let a = self.a.is_high().pin_err()?;
        let b = self.b.is_high().pin_err()?;
        Ok(self.quad.update(a, b))
    }

    /// Levels captured by an edge interrupt.
    pub fn on_edge(&mut self, a: bool, b: bool) -> Turn {
        self.quad.update(a, b)
    }

    pub fn position(&self) -> i32 {
        self.quad.position()
    }

    pub fn last_turn(&self) -> Turn {
        self.quad.last_turn()
    }

    pub fn take_delta(&mut self) -> i32 {
        self.quad.take_delta()
    }

    pub fn reset(&mut self) {
        self.quad.reset();
    }

    pub fn release(self) -> (A, B) {
        (self.a, self.b)
    }
}

/// Encoder state in a `static`: the pin ISR calls `on_edge`, the main
/// loop drains `take_delta`.
pub struct SharedEncoder {
    cell: Shared<Quadrature>,
}

impl SharedEncoder {
    pub const fn new(per_detent: StepsPerDetent) -> Self {
        Self {
            cell: Shared::new(Quadrature::new(per_detent)),
        }
    }

    /// Seed the resting AB levels (read once at startup, before the
    /// edge interrupt is enabled).
    pub fn set_levels(&self, a: bool, b: bool) {
        self.cell.update(|q| q.set_levels(a, b));
    }

    pub fn on_edge(&self, a: bool, b: bool) -> Turn {
        self.cell.update(|q| q.update(a, b))
    }

    pub fn position(&self) -> i32 {
        self.cell.get().position()
    }

    pub fn take_delta(&self) -> i32 {
        self.cell.update(|q| q.take_delta())
    }

    pub fn snapshot(&self) -> Quadrature {
        self.cell.get()
    }
}
