//! Bounded queue of completed inbound frames, shared between the radio
//! interrupt (producer) and the task-context network device (consumer).
//!
//! Backed by an [`embassy_sync::channel::Channel`] guarded by a critical
//! section, so pushing from an interrupt never blocks and never allocates.
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

use crate::protocol::transport::radio_frame::RadioFrame;

/// Default capacity used by firmware that does not pick its own.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Fixed-capacity frame queue. Full queue drops the newest push.
pub struct MessageQueue<const N: usize = DEFAULT_QUEUE_CAPACITY> {
    channel: Channel<CriticalSectionRawMutex, RadioFrame, N>,
}

impl<const N: usize> Default for MessageQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MessageQueue<N> {
    /// Create an empty queue; usable in a `static` initializer.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push a frame without blocking. Returns `false` if the queue was full
    /// and the frame was dropped.
    pub fn push(&self, frame: RadioFrame) -> bool {
        match self.channel.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Inbound queue full, dropping frame");
                false
            }
        }
    }

    /// Remove the oldest frame, if any.
    pub fn pop(&self) -> Option<RadioFrame> {
        self.channel.try_receive().ok()
    }

    /// Wait until a frame is available and remove it.
    pub async fn receive(&self) -> RadioFrame {
        self.channel.receive().await
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
