use core::fmt;

/// Failure of a single register transaction.
#[derive(derive_more::From, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError<E> {
    /// The bus transfer itself failed; carries the platform error.
    I2c(E),
    /// The write payload did not fit in one frame.
    PayloadTooLong,
}

impl<E: fmt::Debug> fmt::Display for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::I2c(err) => write!(f, "I2C transfer failed: {:?}", err),
            TransportError::PayloadTooLong => write!(
                f,
                "register payload exceeds {} bytes",
                crate::MAX_PAYLOAD
            ),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for TransportError<E> {}

/// Coarse classification shared by every driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// A bus transfer failed.
    Io,
    /// The device at the address did not identify as expected.
    DeviceNotFound,
    /// The device did not follow the expected register sequence.
    Protocol,
    /// A polling budget ran out.
    Timeout,
    /// A caller-supplied parameter was outside its valid range.
    InvalidArgument,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "I/O error",
            ErrorKind::DeviceNotFound => "device not found",
            ErrorKind::Protocol => "protocol error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidArgument => "invalid argument",
        };
        f.write_str(name)
    }
}
