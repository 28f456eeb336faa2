//! Asynchronous delay abstraction driving the task-context housekeeping loop.

/// Timer trait abstraction; must remain thread-safe when applicable.
pub trait DelayTimer {
    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a;
}
