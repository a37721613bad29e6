// Resistor-ladder buttons on one analog pin
//
// Each button pulls the divider to a known voltage. A reading matches a
// button when center - tolerance <= mv <= center + tolerance; readings
// outside every window are "nothing pressed". Only one button can be
// seen at a time, the lowest resistor wins.

use log::trace;

use crate::analog::AnalogInput;
use crate::error::Error;

use super::button::{Debouncer, Event, Timing};

pub const DEFAULT_TOLERANCE_MV: u16 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold<B> {
    pub center_mv: u16,
    pub tolerance_mv: u16,
    pub button: B,
}

impl<B> Threshold<B> {
    pub const fn new(center_mv: u16, tolerance_mv: u16, button: B) -> Self {
        Self {
            center_mv,
            tolerance_mv,
            button,
        }
    }

    fn low(&self) -> u16 {
        self.center_mv.saturating_sub(self.tolerance_mv)
    }

    fn high(&self) -> u16 {
        self.center_mv.saturating_add(self.tolerance_mv)
    }

    pub fn matches(&self, mv: u16) -> bool {
        mv >= self.low() && mv <= self.high()
    }
}

/// First threshold whose window contains `mv`.
pub fn decode_ladder<B: Copy>(mv: u16, thresholds: &[Threshold<B>]) -> Option<B> {
    thresholds.iter().find(|t| t.matches(mv)).map(|t| t.button)
}

pub struct ResistorLadder<'t, A, B> {
    input: A,
    thresholds: &'t [Threshold<B>],
    debouncer: Debouncer<B>,
}

impl<'t, A, B> ResistorLadder<'t, A, B>
where
    A: AnalogInput,
    B: Copy + PartialEq,
{
    pub fn new(input: A, thresholds: &'t [Threshold<B>]) -> Result<Self, Error<A::Error>> {
        Self::with_timing(input, thresholds, Timing::default())
    }

    pub fn with_timing(
        input: A,
        thresholds: &'t [Threshold<B>],
        timing: Timing,
    ) -> Result<Self, Error<A::Error>> {
        if thresholds.is_empty() {
            return Err(Error::InvalidConfig("ladder needs at least one threshold"));
        }
        for (i, a) in thresholds.iter().enumerate() {
            for b in &thresholds[i + 1..] {
                if a.low() <= b.high() && b.low() <= a.high() {
                    return Err(Error::InvalidConfig("ladder windows overlap"));
                }
            }
        }
        Ok(Self {
            input,
            thresholds,
            debouncer: Debouncer::new(timing),
        })
    }

    /// One conversion, decoded without debouncing.
    pub fn read_button(&mut self) -> Result<Option<B>, Error<A::Error>> {
        let mv = nb::block!(self.input.read_mv()).map_err(Error::Bus)?;
        trace!("ladder {} mV", mv);
        Ok(decode_ladder(mv, self.thresholds))
    }

    pub fn poll(&mut self, now_ms: u32) -> Result<Option<Event<B>>, Error<A::Error>> {
        if let Some(ev) = self.debouncer.next_queued() {
            return Ok(Some(ev));
        }
        let raw = self.read_button()?;
        Ok(self.debouncer.poll(raw, now_ms))
    }

    pub fn pressed(&self) -> Option<B> {
        self.debouncer.pressed()
    }

    pub fn release(self) -> A {
        self.input
    }
}
