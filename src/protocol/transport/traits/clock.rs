//! Time sources: the free-running microsecond clock shared by every layer and
//! the one-shot hardware timer that fires scheduled radio actions.

/// Free-running 32-bit microsecond counter. Wraps roughly every 71 minutes;
/// consumers compare timestamps with wrapping arithmetic only.
pub trait MicrosClock {
    fn now_us(&self) -> u32;
}

impl<C: MicrosClock + ?Sized> MicrosClock for &C {
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}

/// One-shot hardware timer whose expiry interrupt calls
/// [`TransmitScheduler::on_timer_fire`](crate::protocol::transport::scheduler::TransmitScheduler::on_timer_fire).
pub trait OneShotTimer {
    /// (Re)arm the timer to expire `delay_us` microseconds from now.
    fn arm(&mut self, delay_us: u32);
    /// Stop the timer; a pending expiry must not fire.
    fn disarm(&mut self);
}
