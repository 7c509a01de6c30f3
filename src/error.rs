//! Error handling primitives for the transfer engine and the BMI270 layer.

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the engine and its transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the select pin or the underlying SPI device.
    Interface(E),
    /// Register out of range, empty buffer, or length above the configured maximum.
    InvalidArgument,
    /// A transaction is already in flight.
    Busy,
    /// The wake budget ran out before the device clocked every byte.
    Stalled,
    /// The provided configuration parameters are invalid.
    InvalidConfig,
    /// The transfer cell already owns a peripheral.
    AlreadyInitialized,
    /// The chip id read back from the device did not match.
    DeviceNotFound,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}
