//! Sink for outbound radio actions produced by the network device.
use crate::protocol::transport::radio_frame::{FrameAction, RadioFrame};

/// Accepts an action to perform at an absolute device-clock deadline.
pub trait ActionScheduler {
    /// Queue `action` for `start_time_us`. Returns `false` when the action was
    /// dropped (table full); callers do not retry.
    fn schedule(&self, action: FrameAction, start_time_us: u32, frame: RadioFrame) -> bool;
}

impl<S: ActionScheduler + ?Sized> ActionScheduler for &S {
    fn schedule(&self, action: FrameAction, start_time_us: u32, frame: RadioFrame) -> bool {
        (**self).schedule(action, start_time_us, frame)
    }
}
