use core::fmt;

use register_transport::{ErrorKind, TransportError};

use crate::calibration::InitStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A register transfer failed.
    Transport(TransportError<E>),
    /// MODEL_ID did not read 0xEE; carries what was read.
    InvalidModelId(u8),
    /// The sensor did not become ready within the polling budget.
    Timeout,
    /// Timing budget below 20 000 µs.
    InvalidTimingBudget(u32),
}

impl<E> Error<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Io,
            Error::InvalidModelId(_) => ErrorKind::DeviceNotFound,
            Error::Timeout => ErrorKind::Timeout,
            Error::InvalidTimingBudget(_) => ErrorKind::InvalidArgument,
        }
    }
}

impl<E> From<TransportError<E>> for Error<E> {
    fn from(e: TransportError<E>) -> Self {
        Error::Transport(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "VL53L0X {}", err),
            Error::InvalidModelId(id) => write!(
                f,
                "unexpected VL53L0X MODEL_ID {:#04x} (expected 0xee)",
                id
            ),
            Error::Timeout => write!(f, "VL53L0X measurement timed out"),
            Error::InvalidTimingBudget(us) => {
                write!(f, "timing budget {} us below 20000 us", us)
            }
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}

/// Failure of [`Vl53l0x::init_extended`](crate::Vl53l0x::init_extended),
/// tagged with the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitError<E> {
    pub stage: InitStage,
    pub error: Error<E>,
}

impl<E> InitError<E> {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl<E: fmt::Debug> fmt::Display for InitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl<E: fmt::Debug> core::error::Error for InitError<E> {}
