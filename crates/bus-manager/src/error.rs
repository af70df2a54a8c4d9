/// Errors that can occur during bus operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E: core::fmt::Debug> {
    /// The bus factory failed to open or close the bus.
    FactoryError(E),
    /// Bus is currently in use by `n` handles and cannot be released.
    InUse(usize),
    /// Bus manager is in an unrecoverable state.
    Poisoned,
}

impl<E: core::fmt::Debug> core::fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusError::FactoryError(err) => write!(f, "bus factory error: {:?}", err),
            BusError::InUse(n) => write!(f, "bus still held by {} handle(s)", n),
            BusError::Poisoned => write!(f, "bus manager poisoned"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for BusError<E> {}
