use crate::{
    driver::DeviceState,
    frame::ChecksumError,
    register::RunState,
    status::WhoAmI,
};

/// Error type for SCL3300 operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the sensor
    Communication(E),
    /// CRC mismatch in received frame
    Checksum(ChecksumError),
    /// Status or identification check failed during initialization
    Handshake {
        /// Return status read from the status summary
        run_state: RunState,
        /// Identification byte read from `WHOAMI`
        whoami: WhoAmI,
    },
    /// No sample passed validation during calibration or averaging
    NoValidSamples,
    /// The operation is not allowed in the current device state
    InvalidState(DeviceState),
}

impl<E> From<ChecksumError> for Error<E> {
    fn from(err: ChecksumError) -> Self {
        Error::Checksum(err)
    }
}

impl<E: embedded_hal::spi::Error> Error<E> {
    /// Map a communication error onto the generic SPI error kind
    ///
    /// Returns `None` for errors raised by the driver itself
    pub fn kind(&self) -> Option<embedded_hal::spi::ErrorKind> {
        match self {
            Error::Communication(e) => Some(e.kind()),
            _ => None,
        }
    }
}
