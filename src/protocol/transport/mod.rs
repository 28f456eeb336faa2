//! Radio link layer: frame representation, transceiver register map, the
//! interrupt-driven link driver, the inbound frame queue, the deadline
//! scheduler, and the hardware abstraction traits they rely on.
//!
//! ## Link timing constants
//!
//! Every duration below derives from the configured air bit rate. The link
//! driver uses them to back-date inbound frames to the first preamble bit, and
//! the scheduler uses them to fire the transmitter early enough that the frame
//! starts on air at its deadline.

pub mod link_driver;
pub mod message_queue;
pub mod radio_frame;
pub mod registers;
pub mod scheduler;
pub mod traits;

/// Air bit rate of the network (bit/s).
pub const BIT_RATE_BPS: u32 = 100_000;

/// Duration of one byte on air (µs).
pub const BYTE_DURATION_US: u32 = 8 * 1_000_000 / BIT_RATE_BPS;

/// Preamble length programmed by default (bytes).
pub const DEFAULT_PREAMBLE_BYTES: u16 = 4;

/// Number of sync word bytes following the preamble.
pub const SYNC_WORD_BYTES: u32 = 1;

/// Time between the first preamble bit and the first header byte.
pub const fn preamble_duration_us(preamble_bytes: u16) -> u32 {
    (preamble_bytes as u32 + SYNC_WORD_BYTES) * BYTE_DURATION_US
}

/// Time needed to receive the complete link-layer header.
pub const HEADER_DURATION_US: u32 = radio_frame::HEADER_LENGTH as u32 * BYTE_DURATION_US;

/// Time between the scheduler firing and the first preamble bit leaving the
/// antenna (FIFO load plus synthesizer and PA ramp-up).
///
/// # Budget
///
/// - FIFO burst write of a full frame over SPI @ 8 MHz: ~70 µs
/// - Standby → FsTx with PLL lock: ~60 µs
/// - FsTx → Tx ramp: ~20 µs
/// - Interrupt entry and critical section: a few µs
///
/// The remainder is margin for slower SPI clocks.
pub const TX_LATENCY_COMPENSATION_US: u32 = 300;

/// Any computed timer delay beyond this bound is considered stale.
///
/// Deadlines are scheduled at most a few network cycles ahead, so a delay of
/// more than a minute can only come from a deadline already in the past
/// (wrapped subtraction) or from a corrupted map.
pub const MAX_SCHEDULE_AHEAD_US: u32 = 60_000_000;

/// How far past its deadline an action may still be fired.
///
/// The timer expires [`TX_LATENCY_COMPENSATION_US`] ahead of each deadline
/// and the fire handler takes time of its own, so the next of two close
/// deadlines is routinely reached a little late. Such an action fires at
/// once; only one missed by more than this bound is discarded.
pub const MAX_LATE_US: u32 = 2_000;

/// Lead time for leaving low-power mode before the next network cycle, so
/// the crystal oscillator settles before the beacon.
pub const POWER_UP_LEAD_US: u32 = 1_000;
