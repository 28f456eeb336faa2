//! Error definitions shared across library modules.
//! Only conditions a caller can act on live here: transceiver detection,
//! bus failures, and mode transitions that never complete. Link-level
//! glitches (bad headers, overruns, full queues) are handled where they occur
//! and never reach these types.
use crate::protocol::transport::registers::RadioMode;
use thiserror_no_std::Error;

#[derive(Error, Debug)]
/// Errors raised by the radio link driver.
pub enum LinkError<E: core::fmt::Debug> {
    /// The register bus reported a failure.
    #[error("Register bus error: {0:?}")]
    Bus(E),

    /// The identity register did not hold the expected silicon version.
    #[error("Transceiver not found (version register = {version:#04X})")]
    TransceiverNotFound { version: u8 },

    /// The transceiver never confirmed a requested operating mode.
    #[error("Mode {mode:?} was not confirmed in time")]
    ModeTimeout { mode: RadioMode },

    /// Outbound frame does not fit the transceiver FIFO.
    #[error("Frame too long for the FIFO: {len} bytes")]
    FrameTooLong { len: usize },
}

//==================================================================================SPI_BUS_ERROR
#[derive(Error, Debug)]
/// Failures of the embedded-hal backed register bus.
pub enum SpiBusError<S: core::fmt::Debug, P: core::fmt::Debug> {
    /// SPI transaction failed.
    #[error("SPI error: {0:?}")]
    Spi(S),
    /// Reset pin could not be driven.
    #[error("Reset pin error: {0:?}")]
    Pin(P),
}
