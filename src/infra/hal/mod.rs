//! Adapters binding the crate's hardware traits to the embedded ecosystem.
pub mod embassy_clock;
pub mod spi_register_bus;
