//! Device clock backed by the embassy time driver.
use embassy_time::Instant;

use crate::protocol::transport::traits::clock::MicrosClock;

/// [`MicrosClock`] reading the embassy time driver, truncated to 32 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl MicrosClock for EmbassyClock {
    fn now_us(&self) -> u32 {
        // Truncation is the wrap of the 32-bit device clock.
        Instant::now().as_micros() as u32
    }
}
