//! [`RegisterBus`] over an embedded-hal 1.0 SPI device.
//!
//! The transceiver uses one address byte per access: MSB set for a write,
//! clear for a read, followed by data bytes. Burst access to the FIFO keeps
//! chip-select asserted for the whole transfer.
use embedded_hal::{
    delay::DelayNs,
    digital::OutputPin,
    spi::{Operation, SpiDevice},
};

use crate::{
    error::SpiBusError,
    protocol::transport::{registers::REG_FIFO, traits::register_bus::RegisterBus},
};

const WRITE_FLAG: u8 = 0x80;
/// Reset line held low this long.
const RESET_PULSE_US: u32 = 100;
/// Time the chip needs after reset before it accepts commands.
const RESET_RECOVERY_US: u32 = 5_000;

/// Register bus built from an SPI device, the reset line and a delay source.
pub struct SpiRegisterBus<SPI, RST, D> {
    spi: SPI,
    reset_pin: RST,
    delay: D,
}

impl<SPI, RST, D> SpiRegisterBus<SPI, RST, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, reset_pin: RST, delay: D) -> Self {
        Self {
            spi,
            reset_pin,
            delay,
        }
    }

    /// Give the peripherals back.
    pub fn release(self) -> (SPI, RST, D) {
        (self.spi, self.reset_pin, self.delay)
    }
}

impl<SPI, RST, D> RegisterBus for SpiRegisterBus<SPI, RST, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    D: DelayNs,
{
    type Error = SpiBusError<SPI::Error, RST::Error>;

    fn read_register(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut frame = [address & !WRITE_FLAG, 0];
        self.spi
            .transfer_in_place(&mut frame)
            .map_err(SpiBusError::Spi)?;
        Ok(frame[1])
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        self.spi
            .write(&[address | WRITE_FLAG, value])
            .map_err(SpiBusError::Spi)
    }

    fn read_fifo(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[REG_FIFO & !WRITE_FLAG]),
                Operation::Read(buffer),
            ])
            .map_err(SpiBusError::Spi)
    }

    fn write_fifo(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[REG_FIFO | WRITE_FLAG]),
                Operation::Write(data),
            ])
            .map_err(SpiBusError::Spi)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.reset_pin.set_low().map_err(SpiBusError::Pin)?;
        self.delay.delay_us(RESET_PULSE_US);
        self.reset_pin.set_high().map_err(SpiBusError::Pin)?;
        self.delay.delay_us(RESET_RECOVERY_US);
        Ok(())
    }

    fn delay_us(&mut self, micros: u32) {
        self.delay.delay_us(micros);
    }
}
