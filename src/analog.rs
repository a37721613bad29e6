// One-shot analog inputs.
//
// embedded-hal 1.0 has no ADC trait, so drivers that read a voltage take
// anything implementing `AnalogInput` (MCU ADC pin, external ADC channel)
// and block on it with nb::block!.

/// A single analog channel that can be sampled in millivolts.
pub trait AnalogInput {
    type Error;

    /// Start or finish a conversion. `WouldBlock` while it is in flight.
    fn read_mv(&mut self) -> nb::Result<u16, Self::Error>;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    type Error = T::Error;

    fn read_mv(&mut self) -> nb::Result<u16, Self::Error> {
        T::read_mv(self)
    }
}
