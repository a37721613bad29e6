// Debounced buttons with long press and auto-repeat
//
// The raw state must hold for debounce_ms before it is accepted. A held
// button fires LongPress after long_press_ms, then Repeat every
// repeat_ms until released. All times are caller-supplied milliseconds
// and compared with wrapping arithmetic, so a u32 tick counter that
// rolls over is fine.
//
// Defaults: 30 ms debounce, 1 s long press, 150 ms repeat.

use embedded_hal::digital::InputPin;

use crate::error::{Error, PinResultExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<B = ()> {
    Press(B),
    Release(B),
    LongPress(B),
    Repeat(B),
}

impl<B: Copy> Event<B> {
    pub fn button(&self) -> B {
        match *self {
            Event::Press(b) | Event::Release(b) | Event::LongPress(b) | Event::Repeat(b) => b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce_ms: u32,
    pub long_press_ms: u32,
    pub repeat_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce_ms: 30,
            long_press_ms: 1000,
            repeat_ms: 150,
        }
    }
}

// a switch between two buttons produces Release + Press in one poll
struct EventQueue<B> {
    buf: [Option<Event<B>>; 2],
}

impl<B: Copy> EventQueue<B> {
    const fn new() -> Self {
        Self { buf: [None; 2] }
    }

    fn push(&mut self, ev: Event<B>) {
        for slot in self.buf.iter_mut() {
            if slot.is_none() {
                *slot = Some(ev);
                return;
            }
        }
    }

    fn pop(&mut self) -> Option<Event<B>> {
        for slot in self.buf.iter_mut() {
            if let Some(ev) = slot.take() {
                return Some(ev);
            }
        }
        None
    }
}

/// Debounce state machine over any button identity (`()` for a single
/// switch, an enum for a ladder).
pub struct Debouncer<B = ()> {
    timing: Timing,
    stable: Option<B>,
    candidate: Option<B>,
    candidate_since: u32,
    press_since: u32,
    long_press_fired: bool,
    last_repeat: u32,
    queue: EventQueue<B>,
}

impl<B: Copy + PartialEq> Debouncer<B> {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            stable: None,
            candidate: None,
            candidate_since: 0,
            press_since: 0,
            long_press_fired: false,
            last_repeat: 0,
            queue: EventQueue::new(),
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Events left over from a previous poll.
    pub fn next_queued(&mut self) -> Option<Event<B>> {
        self.queue.pop()
    }

    /// Feed the raw (undebounced) state at `now_ms`.
    pub fn poll(&mut self, raw: Option<B>, now_ms: u32) -> Option<Event<B>> {
        if let Some(ev) = self.queue.pop() {
            return Some(ev);
        }

        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since = now_ms;
        }

        let debounced = if now_ms.wrapping_sub(self.candidate_since) >= self.timing.debounce_ms {
            self.candidate
        } else {
            self.stable
        };

        if debounced != self.stable {
            if let Some(old) = self.stable {
                self.queue.push(Event::Release(old));
            }
            if let Some(new) = debounced {
                self.queue.push(Event::Press(new));
                self.press_since = now_ms;
                self.long_press_fired = false;
                self.last_repeat = now_ms;
            }
            self.stable = debounced;
            return self.queue.pop();
        }

        if let Some(btn) = self.stable {
            let held = now_ms.wrapping_sub(self.press_since);

            if !self.long_press_fired && held >= self.timing.long_press_ms {
                self.long_press_fired = true;
                self.last_repeat = now_ms;
                return Some(Event::LongPress(btn));
            }

            if self.long_press_fired
                && now_ms.wrapping_sub(self.last_repeat) >= self.timing.repeat_ms
            {
                self.last_repeat = now_ms;
                return Some(Event::Repeat(btn));
            }
        }

        None
    }

    /// Debounced state.
    pub fn pressed(&self) -> Option<B> {
        self.stable
    }

    pub fn is_debouncing(&self) -> bool {
        self.candidate != self.stable
    }
}

impl<B: Copy + PartialEq> Default for Debouncer<B> {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

/// One switch on a GPIO.
pub struct PushButton<P> {
    pin: P,
    active_low: bool,
    debouncer: Debouncer,
}

impl<P: InputPin> PushButton<P> {
    /// `active_low` for a switch to ground with a pull-up.
    pub fn new(pin: P, active_low: bool) -> Self {
        Self::with_timing(pin, active_low, Timing::default())
    }

    pub fn with_timing(pin: P, active_low: bool, timing: Timing) -> Self {
        Self {
            pin,
            active_low,
            debouncer: Debouncer::new(timing),
        }
    }

    /// Raw pin state, no debouncing.
    pub fn is_pressed(&mut self) -> Result<bool, Error> {
        let high = self.pin.is_high().pin_err()?;
        Ok(high != self.active_low)
    }

    pub fn poll(&mut self, now_ms: u32) -> Result<Option<Event>, Error> {
        if let Some(ev) = self.debouncer.next_queued() {
            return Ok(Some(ev));
        }
        let raw = self.is_pressed()?.then_some(());
        Ok(self.debouncer.poll(raw, now_ms))
    }

    pub fn is_held(&self) -> bool {
        self.debouncer.pressed().is_some()
    }

    pub fn release(self) -> P {
        self.pin
    }
}
