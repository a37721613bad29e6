// Single expander pin as an embedded-hal pin.
//
// Handles borrow the driver through a RefCell so several pins can be
// handed to different consumers. Each call takes the borrow for one
// register access only.

use core::cell::RefCell;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use super::interface::RegisterInterface;
use super::mcp23xxx::{Mcp23xxx, PinDirection};
use crate::error::Error;

pub struct ExpanderPin<'a, IF> {
    dev: &'a RefCell<Mcp23xxx<IF>>,
    pin: u8,
}

impl<'a, IF: RegisterInterface> ExpanderPin<'a, IF> {
    pub fn new(dev: &'a RefCell<Mcp23xxx<IF>>, pin: u8) -> Result<Self, Error<IF::Error>> {
        if pin >= dev.borrow().pin_count() {
            return Err(Error::InvalidConfig("expander pin out of range"));
        }
        Ok(Self { dev, pin })
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn into_output(self, initial_high: bool) -> Result<Self, Error<IF::Error>> {
        {
            let mut dev = self.dev.borrow_mut();
            dev.write_pin(self.pin, initial_high)?;
            dev.set_direction(self.pin, PinDirection::Output)?;
        }
        Ok(self)
    }

    pub fn into_input(self, pull_up: bool) -> Result<Self, Error<IF::Error>> {
        {
            let mut dev = self.dev.borrow_mut();
            dev.set_direction(self.pin, PinDirection::Input)?;
            dev.set_pull_up(self.pin, pull_up)?;
        }
        Ok(self)
    }
}

impl<IF: RegisterInterface> ErrorType for ExpanderPin<'_, IF> {
    type Error = Error<IF::Error>;
}

impl<IF: RegisterInterface> OutputPin for ExpanderPin<'_, IF> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.dev.borrow_mut().write_pin(self.pin, false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.dev.borrow_mut().write_pin(self.pin, true)
    }
}

impl<IF: RegisterInterface> StatefulOutputPin for ExpanderPin<'_, IF> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        self.dev.borrow().is_set_high(self.pin)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.dev.borrow().is_set_high(self.pin)?)
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.dev.borrow_mut().toggle_pin(self.pin)
    }
}

impl<IF: RegisterInterface> InputPin for ExpanderPin<'_, IF> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.dev.borrow_mut().read_pin(self.pin)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.dev.borrow_mut().read_pin(self.pin)?)
    }
}
