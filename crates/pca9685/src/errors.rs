use core::fmt;

use register_transport::{ErrorKind, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A register transfer failed.
    Transport(TransportError<E>),
    /// MODE1 did not report RESTART after entering sleep; carries MODE1.
    RestartNotAcknowledged(u8),
    /// Requested frequency outside 24..=1526 Hz.
    InvalidFrequency(u16),
    /// Channel index above 15.
    InvalidChannel(u8),
}

impl<E> Error<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Io,
            Error::RestartNotAcknowledged(_) => ErrorKind::Protocol,
            Error::InvalidFrequency(_) | Error::InvalidChannel(_) => {
                ErrorKind::InvalidArgument
            }
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
            Error::Transport(err) => write!(f, "PCA9685 {}", err),
            Error::RestartNotAcknowledged(mode1) => write!(
                f,
                "PCA9685 reset: RESTART bit not set (MODE1 = {:#04x})",
                mode1
            ),
            Error::InvalidFrequency(hz) => {
                write!(f, "PWM frequency {} Hz outside 24..=1526 Hz", hz)
            }
            Error::InvalidChannel(ch) => {
                write!(f, "PWM channel {} outside 0..=15", ch)
            }
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
