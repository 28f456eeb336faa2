//! In-memory representation of one physical-layer frame, inbound or outbound.

/// Size of the frame buffer. A valid frame is strictly shorter.
pub const MAX_FRAME_SIZE: usize = 64;

/// Link-layer header length. Bytes 0 and 1 carry the redundant length fields.
pub const HEADER_LENGTH: usize = 8;

/// Shortest frame accepted on the receive path (header only).
pub const MIN_FRAME_SIZE: usize = HEADER_LENGTH;

/// Bytes counted by the length field's origin: the field itself and its copy.
pub const LENGTH_FIELD_OVERHEAD: usize = 2;

/// What a frame asks the link layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameAction {
    /// Frame was received from the air.
    Receive,
    /// Frame must be transmitted.
    Transmit,
    /// Put the transceiver in low-power mode (no payload).
    EnterLowPower,
    /// Bring the transceiver back to reception (no payload).
    ExitLowPower,
    /// Empty entry.
    NoAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Raw link-layer frame plus its timing metadata.
pub struct RadioFrame {
    /// Frame bytes, header included.
    pub data: [u8; MAX_FRAME_SIZE],
    /// Number of valid bytes (0 for pure control actions).
    pub len: usize,
    /// Device-clock timestamp of the first preamble bit (µs, wrapping).
    pub start_time_us: u32,
    /// Requested or performed action.
    pub action: FrameAction,
    /// Signal strength in dBm, set once the header is validated.
    pub rssi: i16,
}

impl Default for RadioFrame {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl RadioFrame {
    /// Free frame, usable as an array initializer.
    pub const EMPTY: Self = Self {
        data: [0; MAX_FRAME_SIZE],
        len: 0,
        start_time_us: 0,
        action: FrameAction::NoAction,
        rssi: 0,
    };

    /// Build a payload-less frame carrying only an action.
    pub const fn control(action: FrameAction, start_time_us: u32) -> Self {
        Self {
            data: [0; MAX_FRAME_SIZE],
            len: 0,
            start_time_us,
            action,
            rssi: 0,
        }
    }

    /// Build an outbound frame from raw bytes. `None` when they do not fit
    /// the frame buffer.
    pub fn transmit(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > MAX_FRAME_SIZE {
            #[cfg(feature = "defmt")]
            defmt::warn!("Outbound frame of {=usize} bytes does not fit", bytes.len());
            return None;
        }
        let mut frame = Self::control(FrameAction::Transmit, 0);
        frame.data[..bytes.len()].copy_from_slice(bytes);
        frame.len = bytes.len();
        Some(frame)
    }

    /// Valid bytes of the frame.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

//==================================================================================HEADER_LENGTH
/// Extract the declared total frame length from a received header.
///
/// Both length fields must agree and the total (`field + 2`) must fall in
/// `[MIN_FRAME_SIZE, MAX_FRAME_SIZE)`. Returns `None` otherwise.
pub fn declared_length(header: &[u8]) -> Option<usize> {
    if header.len() < LENGTH_FIELD_OVERHEAD {
        return None;
    }
    if header[0] != header[1] {
        return None;
    }
    let total = header[0] as usize + LENGTH_FIELD_OVERHEAD;
    (MIN_FRAME_SIZE..MAX_FRAME_SIZE)
        .contains(&total)
        .then_some(total)
}

/// Write both length fields for a frame whose total length is `total`.
pub fn stamp_length(frame: &mut RadioFrame, total: usize) {
    let field = total.saturating_sub(LENGTH_FIELD_OVERHEAD) as u8;
    frame.data[0] = field;
    frame.data[1] = field;
}
