// Driver error shared by every chip in the crate.
//
// Bus errors are wrapped as-is. Pin errors are erased to `Pin`: the
// pins handed to one driver rarely share an error type.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E = ()> {
    /// I2C/SPI transfer failed, or the analog source reported an error.
    Bus(E),
    /// GPIO or PWM operation failed.
    Pin,
    /// Argument outside what the chip accepts.
    InvalidConfig(&'static str),
    /// Identification register did not match the expected chip.
    UnexpectedId { expected: u16, found: u16 },
    /// Bit-banged transfer was not acknowledged.
    NoAck,
    /// Data-ready / conversion-complete never arrived.
    Timeout,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::Pin => write!(f, "pin error"),
            Error::InvalidConfig(what) => write!(f, "invalid configuration: {}", what),
            Error::UnexpectedId { expected, found } => {
                write!(f, "unexpected chip id {:#06x} (expected {:#06x})", found, expected)
            }
            Error::NoAck => write!(f, "no acknowledge"),
            Error::Timeout => write!(f, "timed out waiting for device"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}

// lets drivers hand out pin/pwm handles whose errors are driver errors
impl<E: fmt::Debug> embedded_hal::digital::Error for Error<E> {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl<E: fmt::Debug> embedded_hal::pwm::Error for Error<E> {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

/// Marker for a failed pin operation; converts into any `Error<E>`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PinFault;

impl<E> From<PinFault> for Error<E> {
    fn from(_: PinFault) -> Self {
        Error::Pin
    }
}

pub(crate) trait PinResultExt<T> {
    fn pin_err(self) -> Result<T, PinFault>;
}

impl<T, PE> PinResultExt<T> for Result<T, PE> {
    #[inline]
    fn pin_err(self) -> Result<T, PinFault> {
        self.map_err(|_| PinFault)
    }
}
