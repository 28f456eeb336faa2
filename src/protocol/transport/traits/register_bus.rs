//! Minimal abstraction for the transceiver register interface. Lets the link
//! driver run on any SPI HAL, and on a simulated transceiver in tests.

/// Blocking register access to the transceiver.
///
/// Every call must complete in bounded time: the link driver runs from
/// interrupt context and never waits on anything else than these calls.
pub trait RegisterBus {
    type Error: core::fmt::Debug;
    /// Read one register.
    fn read_register(&mut self, address: u8) -> Result<u8, Self::Error>;
    /// Write one register.
    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Self::Error>;
    /// Burst-read `buffer.len()` bytes from the FIFO register.
    fn read_fifo(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;
    /// Burst-write `data` into the FIFO register.
    fn write_fifo(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    /// Pulse the hardware reset line and wait for the chip to come back.
    fn reset(&mut self) -> Result<(), Self::Error>;
    /// Busy-wait for `micros` microseconds.
    fn delay_us(&mut self, micros: u32);
}
