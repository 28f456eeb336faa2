//! Static handle through which interrupt trampolines reach the single link
//! driver instance.
//!
//! Interrupt vectors take no context argument. Firmware declares exactly one
//! `static SharedLink`, installs the driver once [`RadioLinkDriver::init`]
//! succeeded, and every vector goes through [`SharedLink::with`]:
//!
//! ```rust,ignore
//! static LINK: SharedLink<RadioLinkDriver<'static, Bus, 8>> = SharedLink::new();
//! static SCHEDULER: TransmitScheduler<HwTimer, HwClock, 16> = /* ... */;
//!
//! #[interrupt]
//! fn EXTI0() {
//!     let now = HwClock.now_us();
//!     LINK.with(|link| link.on_interrupt(now).ok());
//! }
//!
//! #[interrupt]
//! fn TIM2() {
//!     SCHEDULER.on_timer_fire(|action| {
//!         LINK.with(|link| link.execute(&action.frame).ok());
//!     });
//! }
//! ```
//!
//! [`RadioLinkDriver::init`]: super::RadioLinkDriver::init
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// Critical-section protected slot holding the driver.
pub struct SharedLink<D> {
    cell: Mutex<CriticalSectionRawMutex, RefCell<Option<D>>>,
}

impl<D> Default for SharedLink<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> SharedLink<D> {
    /// Empty handle; usable in a `static` initializer.
    pub const fn new() -> Self {
        Self {
            cell: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the driver, returning the one previously installed.
    pub fn install(&self, driver: D) -> Option<D> {
        self.cell.lock(|cell| cell.borrow_mut().replace(driver))
    }

    /// Remove the driver, e.g. to shut the radio down.
    pub fn take(&self) -> Option<D> {
        self.cell.lock(|cell| cell.borrow_mut().take())
    }

    pub fn is_installed(&self) -> bool {
        self.cell.lock(|cell| cell.borrow().is_some())
    }

    /// Run `f` on the driver inside a critical section. Returns `None` when no
    /// driver is installed yet, or when called re-entrantly from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut D) -> R) -> Option<R> {
        self.cell.lock(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }
}
