// Test doubles for the embedded-hal traits.
//
// I2cScript: expected transactions in order, reads answered from the script.
// SpiRecorder: records every transaction's outgoing bytes, answers reads
//   from queued responses.
// Wire/MockPin: GPIO pins sharing one edge log so bit-banged waveforms
//   can be decoded after the fact.
// All doubles are cheap clones over shared state: keep one handle in the
// test, move the other into the driver.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};
use embedded_hal::i2c::{self, I2c, NoAcknowledgeSource};
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::{self, SpiDevice};

use crate::analog::AnalogInput;

// ── I2C ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cOp {
    Write(u8, Vec<u8>),
    Read(u8, Vec<u8>),
    WriteRead(u8, Vec<u8>, Vec<u8>),
    /// Next transaction fails with a NACK, whatever its shape.
    Fail,
}

impl I2cOp {
    pub fn write(addr: u8, bytes: &[u8]) -> Self {
        I2cOp::Write(addr, bytes.to_vec())
    }

    pub fn read(addr: u8, bytes: &[u8]) -> Self {
        I2cOp::Read(addr, bytes.to_vec())
    }

    pub fn write_read(addr: u8, out: &[u8], input: &[u8]) -> Self {
        I2cOp::WriteRead(addr, out.to_vec(), input.to_vec())
    }
}

#[derive(Clone, Default)]
pub struct I2cScript {
    ops: Rc<RefCell<VecDeque<I2cOp>>>,
}

impl I2cScript {
    pub fn new(ops: impl IntoIterator<Item = I2cOp>) -> Self {
        Self {
            ops: Rc::new(RefCell::new(ops.into_iter().collect())),
        }
    }

    pub fn push(&self, op: I2cOp) {
        self.ops.borrow_mut().push_back(op);
    }

    pub fn done(&self) {
        let left = self.ops.borrow();
        assert!(left.is_empty(), "unconsumed i2c ops: {:02x?}", *left);
    }

    fn next(&self) -> I2cOp {
        self.ops
            .borrow_mut()
            .pop_front()
            .expect("i2c transaction past end of script")
    }
}

impl i2c::ErrorType for I2cScript {
    type Error = i2c::ErrorKind;
}

impl I2c for I2cScript {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let nack = i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        let expected = self.next();
        if expected == I2cOp::Fail {
            return Err(nack);
        }
        match (operations, expected) {
            ([i2c::Operation::Write(w)], I2cOp::Write(a, data)) => {
                assert_eq!(a, address, "write address");
                assert_eq!(*w, data.as_slice(), "write payload");
            }
            ([i2c::Operation::Read(r)], I2cOp::Read(a, data)) => {
                assert_eq!(a, address, "read address");
                assert_eq!(r.len(), data.len(), "read length");
                r.copy_from_slice(&data);
            }
            (
                [i2c::Operation::Write(w), i2c::Operation::Read(r)],
                I2cOp::WriteRead(a, out, input),
            ) => {
                assert_eq!(a, address, "write_read address");
                assert_eq!(*w, out.as_slice(), "write_read payload");
                assert_eq!(r.len(), input.len(), "write_read length");
                r.copy_from_slice(&input);
            }
            (ops, expected) => panic!(
                "i2c shape mismatch: expected {:02x?}, got {} operation(s)",
                expected,
                ops.len()
            ),
        }
        Ok(())
    }
}

// ── SPI ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct SpiState {
    frames: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
}

#[derive(Clone, Default)]
pub struct SpiRecorder {
    state: Rc<RefCell<SpiState>>,
}

impl SpiRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes clocked in by the read phases of the next transaction that reads.
    pub fn respond(&self, bytes: &[u8]) {
        self.state.borrow_mut().responses.push_back(bytes.to_vec());
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.borrow().frames.clone()
    }

    pub fn take_frames(&self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.state.borrow_mut().frames)
    }
}

impl spi::ErrorType for SpiRecorder {
    type Error = spi::ErrorKind;
}

impl SpiDevice for SpiRecorder {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let mut written = Vec::new();
        let mut response: Option<VecDeque<u8>> = None;

        for op in operations.iter_mut() {
            match op {
                spi::Operation::Write(w) => written.extend_from_slice(&w[..]),
                spi::Operation::Read(r) => {
                    let src = response
                        .get_or_insert_with(|| state.responses.pop_front().unwrap_or_default().into());
                    for b in r.iter_mut() {
                        *b = src.pop_front().unwrap_or(0);
                    }
                }
                spi::Operation::Transfer(r, w) => {
                    written.extend_from_slice(&w[..]);
                    let src = response
                        .get_or_insert_with(|| state.responses.pop_front().unwrap_or_default().into());
                    for b in r.iter_mut() {
                        *b = src.pop_front().unwrap_or(0);
                    }
                }
                spi::Operation::TransferInPlace(buf) => {
                    written.extend_from_slice(&buf[..]);
                    let src = response
                        .get_or_insert_with(|| state.responses.pop_front().unwrap_or_default().into());
                    for b in buf.iter_mut() {
                        *b = src.pop_front().unwrap_or(0);
                    }
                }
                spi::Operation::DelayNs(_) => {}
            }
        }

        state.frames.push(written);
        Ok(())
    }
}

// ── GPIO ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub pin: &'static str,
    pub high: bool,
}

/// Shared edge log for a group of pins.
#[derive(Clone, Default)]
pub struct Wire {
    log: Rc<RefCell<Vec<Edge>>>,
}

impl Wire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&self, name: &'static str) -> MockPin {
        MockPin {
            name,
            log: self.log.clone(),
            state: Rc::new(RefCell::new(PinState::default())),
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.log.borrow().clone()
    }

    /// Levels written to one pin, in order.
    pub fn levels(&self, pin: &str) -> Vec<bool> {
        self.log
            .borrow()
            .iter()
            .filter(|e| e.pin == pin)
            .map(|e| e.high)
            .collect()
    }

    /// Count of low-to-high transitions on one pin.
    pub fn rising_edges(&self, pin: &str) -> usize {
        let mut prev = false;
        let mut count = 0;
        for high in self.levels(pin) {
            if high && !prev {
                count += 1;
            }
            prev = high;
        }
        count
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

#[derive(Default)]
struct PinState {
    driven: bool,
    inputs: VecDeque<bool>,
    // what reads return once `inputs` runs dry; None echoes the driven level
    idle: Option<bool>,
    reads: usize,
}

#[derive(Clone)]
pub struct MockPin {
    name: &'static str,
    log: Rc<RefCell<Vec<Edge>>>,
    state: Rc<RefCell<PinState>>,
}

impl MockPin {
    /// Queue levels returned by the next reads.
    pub fn feed(&self, levels: &[bool]) {
        self.state.borrow_mut().inputs.extend(levels.iter().copied());
    }

    pub fn set_idle(&self, level: Option<bool>) {
        self.state.borrow_mut().idle = level;
    }

    pub fn driven(&self) -> bool {
        self.state.borrow().driven
    }

    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }

    pub fn pending_inputs(&self) -> usize {
        self.state.borrow().inputs.len()
    }

    fn drive(&mut self, high: bool) {
        self.state.borrow_mut().driven = high;
        self.log.borrow_mut().push(Edge {
            pin: self.name,
            high,
        });
    }

    fn sample(&mut self) -> bool {
        let mut s = self.state.borrow_mut();
        s.reads += 1;
        match s.inputs.pop_front() {
            Some(level) => level,
            None => s.idle.unwrap_or(s.driven),
        }
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.driven())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.driven())
    }
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sample())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sample())
    }
}

// waits complete immediately; the edge is assumed to have happened
impl embedded_hal_async::digital::Wait for MockPin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ── PWM ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockPwm {
    duty: Rc<Cell<u16>>,
    max: u16,
}

impl MockPwm {
    pub fn new(max: u16) -> Self {
        Self {
            duty: Rc::new(Cell::new(0)),
            max,
        }
    }

    pub fn duty(&self) -> u16 {
        self.duty.get()
    }
}

impl embedded_hal::pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        assert!(duty <= self.max, "duty {} above max {}", duty, self.max);
        self.duty.set(duty);
        Ok(())
    }
}

// ── Delay ───────────────────────────────────────────────────────────

/// Adds up requested delays instead of sleeping.
#[derive(Clone, Default)]
pub struct MockDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns.get() / 1_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + ns as u64);
    }
}

// ── Analog ──────────────────────────────────────────────────────────

/// Scripted analog source; `None` entries answer WouldBlock once.
#[derive(Clone, Default)]
pub struct MockAnalog {
    readings: Rc<RefCell<VecDeque<Option<u16>>>>,
}

impl MockAnalog {
    pub fn new(readings: impl IntoIterator<Item = Option<u16>>) -> Self {
        Self {
            readings: Rc::new(RefCell::new(readings.into_iter().collect())),
        }
    }

    pub fn push(&self, mv: u16) {
        self.readings.borrow_mut().push_back(Some(mv));
    }
}

impl AnalogInput for MockAnalog {
    type Error = ();

    fn read_mv(&mut self) -> nb::Result<u16, ()> {
        match self.readings.borrow_mut().pop_front() {
            Some(Some(mv)) => Ok(mv),
            Some(None) => Err(nb::Error::WouldBlock),
            None => Err(nb::Error::Other(())),
        }
    }
}
