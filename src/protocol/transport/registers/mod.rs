//! Register map of the SX127x-family transceiver in FSK packet mode, the
//! operating-mode table, and the static modem configuration of the network.
//!
//! # Operating modes
//!
//! ```text
//! Mode         RegOpMode  Confirmation
//! Sleep        0x00       fixed delay (ModeReady is not reliable in Sleep)
//! Standby      0x01       ModeReady
//! FsTx         0x02       ModeReady
//! Tx           0x03       ModeReady
//! Rx           0x05       ModeReady
//! ```

//==================================================================================Register addresses
pub const REG_FIFO: u8 = 0x00;
pub const REG_OP_MODE: u8 = 0x01;
pub const REG_BITRATE_MSB: u8 = 0x02;
pub const REG_BITRATE_LSB: u8 = 0x03;
pub const REG_FDEV_MSB: u8 = 0x04;
pub const REG_FDEV_LSB: u8 = 0x05;
pub const REG_FRF_MSB: u8 = 0x06;
pub const REG_FRF_MID: u8 = 0x07;
pub const REG_FRF_LSB: u8 = 0x08;
pub const REG_RX_CONFIG: u8 = 0x0D;
pub const REG_RSSI_CONFIG: u8 = 0x0E;
pub const REG_RSSI_VALUE: u8 = 0x11;
pub const REG_RX_BW: u8 = 0x12;
pub const REG_PREAMBLE_MSB: u8 = 0x25;
pub const REG_PREAMBLE_LSB: u8 = 0x26;
pub const REG_SYNC_CONFIG: u8 = 0x27;
pub const REG_SYNC_VALUE1: u8 = 0x28;
pub const REG_PACKET_CONFIG1: u8 = 0x30;
pub const REG_PACKET_CONFIG2: u8 = 0x31;
pub const REG_PAYLOAD_LENGTH: u8 = 0x32;
pub const REG_FIFO_THRESH: u8 = 0x35;
pub const REG_IRQ_FLAGS1: u8 = 0x3E;
pub const REG_IRQ_FLAGS2: u8 = 0x3F;
pub const REG_DIO_MAPPING1: u8 = 0x40;
pub const REG_VERSION: u8 = 0x42;

//==================================================================================Register values
/// Silicon revision reported by a genuine transceiver.
pub const EXPECTED_VERSION: u8 = 0x12;

/// Hardware FIFO capacity (bytes).
pub const FIFO_SIZE: usize = 64;

/// RegIrqFlags1 bit: requested mode is active.
pub const IRQ1_MODE_READY: u8 = 0x80;

/// RegIrqFlags2 bits.
pub const IRQ2_FIFO_EMPTY: u8 = 0x40;
pub const IRQ2_FIFO_LEVEL: u8 = 0x20;
pub const IRQ2_FIFO_OVERRUN: u8 = 0x10;
pub const IRQ2_PACKET_SENT: u8 = 0x08;

/// RegRxConfig: AGC on, receiver triggered by preamble detection.
pub const RX_CONFIG: u8 = 0x0E;
/// RegRxConfig trigger bit: restart the receiver without waiting for PLL relock.
pub const RX_RESTART_WITHOUT_PLL_LOCK: u8 = 0x40;

/// RegRssiConfig: 2-sample smoothing (the minimum).
pub const RSSI_SMOOTHING_2_SAMPLES: u8 = 0x00;

/// RegSyncConfig: sync on, auto restart off, 0xAA preamble polarity, 1 sync byte.
pub const SYNC_CONFIG: u8 = 0x10;

/// RegPacketConfig1: fixed length, no DC-free coding, no hardware CRC, no address filter.
pub const PACKET_CONFIG1_FIXED: u8 = 0x00;
/// RegPacketConfig2: packet data mode.
pub const PACKET_CONFIG2_PACKET_MODE: u8 = 0x40;

/// RegFifoThresh bit: start transmitting as soon as the FIFO is not empty.
pub const TX_START_FIFO_NOT_EMPTY: u8 = 0x80;
/// Largest value the 6-bit FIFO threshold field accepts.
pub const FIFO_THRESHOLD_MAX: u8 = 0x3F;

/// RegDioMapping1: DIO0 = PacketSent (Tx), DIO1 = FifoLevel.
pub const DIO_MAPPING: u8 = 0x00;

/// Bitrate register value for 100 kbit/s with the 32 MHz crystal.
pub const BITRATE_100K: u16 = 0x0140;
/// Frequency deviation register value for 50 kHz (61.035 Hz steps).
pub const FDEV_50K: u16 = 0x0333;

/// Crystal frequency (Hz).
pub const FXOSC_HZ: u64 = 32_000_000;

/// Fixed settle time after requesting Sleep (µs).
pub const SLEEP_SETTLE_US: u32 = 200;
/// Maximum number of polls of ModeReady before giving up.
pub const MODE_READY_POLLS: u32 = 500;
/// Delay between two ModeReady polls (µs).
pub const MODE_READY_POLL_INTERVAL_US: u32 = 2;

//==================================================================================Modes
/// Transceiver operating modes used by the link driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    Sleep,
    Standby,
    FsTx,
    Tx,
    Rx,
}

/// How the driver confirms that a mode change took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeConfirmation {
    /// Poll RegIrqFlags1.ModeReady (bounded).
    ModeReady,
    /// Wait a fixed number of microseconds.
    FixedDelay(u32),
}

/// Register value and confirmation method for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEntry {
    pub op_mode: u8,
    pub confirmation: ModeConfirmation,
}

impl RadioMode {
    /// Table lookup for this mode.
    pub const fn entry(self) -> ModeEntry {
        match self {
            RadioMode::Sleep => ModeEntry {
                op_mode: 0x00,
                confirmation: ModeConfirmation::FixedDelay(SLEEP_SETTLE_US),
            },
            RadioMode::Standby => ModeEntry {
                op_mode: 0x01,
                confirmation: ModeConfirmation::ModeReady,
            },
            RadioMode::FsTx => ModeEntry {
                op_mode: 0x02,
                confirmation: ModeConfirmation::ModeReady,
            },
            RadioMode::Tx => ModeEntry {
                op_mode: 0x03,
                confirmation: ModeConfirmation::ModeReady,
            },
            RadioMode::Rx => ModeEntry {
                op_mode: 0x05,
                confirmation: ModeConfirmation::ModeReady,
            },
        }
    }
}

//==================================================================================Frequency bands
/// Regional radio variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrequencyBand {
    /// 868.3 MHz, 125 kHz receiver bandwidth.
    Eu868,
    /// 915.0 MHz, 250 kHz receiver bandwidth.
    Us915,
}

impl FrequencyBand {
    /// Center frequency (Hz).
    pub const fn center_hz(self) -> u32 {
        match self {
            FrequencyBand::Eu868 => 868_300_000,
            FrequencyBand::Us915 => 915_000_000,
        }
    }

    /// 24-bit carrier register value: `Frf = f * 2^19 / Fxosc`.
    pub const fn frf(self) -> u32 {
        (((self.center_hz() as u64) << 19) / FXOSC_HZ) as u32
    }

    /// RegRxBw value (mantissa 16, exponent per band).
    pub const fn rx_bandwidth(self) -> u8 {
        match self {
            FrequencyBand::Eu868 => 0x02,
            FrequencyBand::Us915 => 0x01,
        }
    }
}

/// Link-level radio configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    pub band: FrequencyBand,
    /// Single sync byte following the preamble.
    pub sync_word: u8,
    /// Preamble length in bytes.
    pub preamble_bytes: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            band: FrequencyBand::Eu868,
            sync_word: 0x2D,
            preamble_bytes: super::DEFAULT_PREAMBLE_BYTES,
        }
    }
}

/// RegFifoThresh value raising FifoLevel once `count` bytes are available.
///
/// `count` is capped to the FIFO capacity and to the 6-bit field.
pub fn fifo_threshold_for(count: usize) -> u8 {
    let count = count.clamp(1, FIFO_SIZE);
    let threshold = ((count - 1) as u8).min(FIFO_THRESHOLD_MAX);
    TX_START_FIFO_NOT_EMPTY | threshold
}

/// Static modem configuration written once at initialization, in order.
pub fn modem_configuration(config: &LinkConfig) -> [(u8, u8); 20] {
    let frf = config.band.frf();
    [
        (REG_OP_MODE, RadioMode::Standby.entry().op_mode),
        (REG_BITRATE_MSB, (BITRATE_100K >> 8) as u8),
        (REG_BITRATE_LSB, BITRATE_100K as u8),
        (REG_FDEV_MSB, (FDEV_50K >> 8) as u8),
        (REG_FDEV_LSB, FDEV_50K as u8),
        (REG_FRF_MSB, (frf >> 16) as u8),
        (REG_FRF_MID, (frf >> 8) as u8),
        (REG_FRF_LSB, frf as u8),
        (REG_RX_BW, config.band.rx_bandwidth()),
        (REG_RX_CONFIG, RX_CONFIG),
        (REG_RSSI_CONFIG, RSSI_SMOOTHING_2_SAMPLES),
        (REG_PREAMBLE_MSB, (config.preamble_bytes >> 8) as u8),
        (REG_PREAMBLE_LSB, config.preamble_bytes as u8),
        (REG_SYNC_CONFIG, SYNC_CONFIG),
        (REG_SYNC_VALUE1, config.sync_word),
        (REG_PACKET_CONFIG1, PACKET_CONFIG1_FIXED),
        (REG_PACKET_CONFIG2, PACKET_CONFIG2_PACKET_MODE),
        (
            REG_PAYLOAD_LENGTH,
            super::radio_frame::MAX_FRAME_SIZE as u8,
        ),
        (
            REG_FIFO_THRESH,
            fifo_threshold_for(super::radio_frame::HEADER_LENGTH),
        ),
        (REG_DIO_MAPPING1, DIO_MAPPING),
    ]
}
