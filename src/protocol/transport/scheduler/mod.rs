//! Deadline scheduler for radio actions.
//!
//! Keeps a fixed table of pending actions, each tagged with an absolute
//! deadline on the 32-bit microsecond device clock, and keeps the one-shot
//! hardware timer armed for the earliest of them. When the timer fires, the
//! armed action is handed to the link driver from interrupt context and the
//! timer is re-armed for the next deadline.
//!
//! # Wraparound
//!
//! Deadlines are never more than a minute ahead while the clock wraps every
//! ~71 minutes, so at most one wrap can separate pending deadlines. When the
//! table holds deadlines in both halves of the 32-bit space, the upper-half
//! ones belong to the current epoch and are served first:
//!
//! ```text
//! 0                        2^31                      2^32
//! |---- next epoch ---------|------- current epoch ---|
//!   (eligible once the        (eligible first)
//!    upper half is empty)
//! ```
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::protocol::transport::{
    radio_frame::{FrameAction, RadioFrame},
    traits::{
        action_scheduler::ActionScheduler,
        clock::{MicrosClock, OneShotTimer},
    },
    MAX_LATE_US, MAX_SCHEDULE_AHEAD_US, TX_LATENCY_COMPENSATION_US,
};

//==================================================================================Constants
/// Default number of pending action slots.
pub const SCHEDULER_SLOTS: usize = 16;

/// First timestamp of the upper half of the clock range.
const UPPER_HALF: u32 = 1 << 31;

//==================================================================================Enums and Structs
/// One scheduled action. `FrameAction::NoAction` marks a free slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub action: FrameAction,
    pub start_time_us: u32,
    pub frame: RadioFrame,
}

impl PendingAction {
    /// Free slot.
    pub const FREE: Self = Self {
        action: FrameAction::NoAction,
        start_time_us: 0,
        frame: RadioFrame::EMPTY,
    };

    pub fn is_free(&self) -> bool {
        self.action == FrameAction::NoAction
    }
}

/// State guarded by the scheduler's critical section.
struct SchedulerState<T: OneShotTimer, const N: usize> {
    timer: T,
    slots: [PendingAction; N],
    armed: Option<usize>,
}

/// Fixed-capacity deadline scheduler driving a one-shot hardware timer.
///
/// Both [`enqueue`](Self::enqueue) (task context) and
/// [`on_timer_fire`](Self::on_timer_fire) (timer interrupt) run their
/// read-modify-write of the table inside the same critical section.
pub struct TransmitScheduler<T: OneShotTimer, C: MicrosClock, const N: usize = SCHEDULER_SLOTS> {
    clock: C,
    state: Mutex<CriticalSectionRawMutex, RefCell<SchedulerState<T, N>>>,
}

impl<T: OneShotTimer, C: MicrosClock, const N: usize> TransmitScheduler<T, C, N> {
    /// Build a scheduler with an empty table and a disarmed timer.
    pub const fn new(timer: T, clock: C) -> Self {
        Self {
            clock,
            state: Mutex::new(RefCell::new(SchedulerState {
                timer,
                slots: [PendingAction::FREE; N],
                armed: None,
            })),
        }
    }

    /// Store an action and re-arm the timer if it became the earliest.
    ///
    /// Returns `false` when every slot is taken; the action is dropped and
    /// the table is left untouched.
    pub fn enqueue(&self, action: FrameAction, start_time_us: u32, mut frame: RadioFrame) -> bool {
        frame.action = action;
        frame.start_time_us = start_time_us;
        let now = self.clock.now_us();

        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let Some(index) = state.slots.iter().position(PendingAction::is_free) else {
                #[cfg(feature = "defmt")]
                defmt::warn!("Scheduler full, dropping {:?} at {=u32}", action, start_time_us);
                return false;
            };
            state.slots[index] = PendingAction {
                action,
                start_time_us,
                frame,
            };
            state.recompute(now);
            true
        })
    }

    /// Timer interrupt handler: release the armed action to `fire`, then arm
    /// the next deadline.
    ///
    /// `fire` runs outside the scheduler's table borrow, so it may enqueue.
    pub fn on_timer_fire<F: FnOnce(&PendingAction)>(&self, fire: F) {
        let released = self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            let index = state.armed.take()?;
            Some(core::mem::replace(&mut state.slots[index], PendingAction::FREE))
        });

        if let Some(action) = released {
            fire(&action);
        }

        let now = self.clock.now_us();
        self.state.lock(|cell| cell.borrow_mut().recompute(now));
    }

    /// Number of occupied slots.
    pub fn pending(&self) -> usize {
        self.state
            .lock(|cell| cell.borrow().slots.iter().filter(|s| !s.is_free()).count())
    }

    /// Deadline the hardware timer is currently armed for.
    pub fn armed_deadline(&self) -> Option<u32> {
        self.state.lock(|cell| {
            let state = cell.borrow();
            state.armed.map(|index| state.slots[index].start_time_us)
        })
    }

    /// Copy of the slot table, for diagnostics.
    pub fn snapshot(&self) -> [PendingAction; N] {
        self.state.lock(|cell| cell.borrow().slots.clone())
    }
}

/// Timer delay for `deadline` seen at `now`, or `None` when the deadline is
/// stale: missed by more than [`MAX_LATE_US`] or further ahead than
/// [`MAX_SCHEDULE_AHEAD_US`]. A deadline inside the latency window, or just
/// missed, fires immediately.
fn arm_delay(deadline: u32, now: u32) -> Option<u32> {
    let ahead = deadline.wrapping_sub(now) as i32;
    if ahead < -(MAX_LATE_US as i32) {
        return None;
    }
    let delay = ahead.saturating_sub(TX_LATENCY_COMPENSATION_US as i32).max(0) as u32;
    (delay <= MAX_SCHEDULE_AHEAD_US).then_some(delay)
}

impl<T: OneShotTimer, const N: usize> SchedulerState<T, N> {
    /// Arm the timer for the earliest eligible deadline, discarding stale ones.
    fn recompute(&mut self, now: u32) {
        loop {
            let Some(index) = self.earliest() else {
                if self.armed.take().is_some() {
                    self.timer.disarm();
                }
                return;
            };

            if self.armed == Some(index) {
                return;
            }

            self.timer.disarm();
            let deadline = self.slots[index].start_time_us;
            let Some(delay) = arm_delay(deadline, now) else {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "Discarding stale {:?} at {=u32} (now {=u32})",
                    self.slots[index].action,
                    deadline,
                    now
                );
                self.slots[index] = PendingAction::FREE;
                self.armed = None;
                continue;
            };

            self.timer.arm(delay);
            self.armed = Some(index);
            return;
        }
    }

    /// Index of the earliest deadline, honoring the wraparound rule.
    fn earliest(&self) -> Option<usize> {
        let mut has_lower = false;
        let mut has_upper = false;
        for slot in self.slots.iter().filter(|s| !s.is_free()) {
            if slot.start_time_us < UPPER_HALF {
                has_lower = true;
            } else {
                has_upper = true;
            }
        }
        let upper_only = has_lower && has_upper;

        let mut best: Option<usize> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.is_free() || (upper_only && slot.start_time_us < UPPER_HALF) {
                continue;
            }
            match best {
                Some(b) if self.slots[b].start_time_us <= slot.start_time_us => {}
                _ => best = Some(index),
            }
        }
        best
    }
}

impl<T: OneShotTimer, C: MicrosClock, const N: usize> ActionScheduler for TransmitScheduler<T, C, N> {
    fn schedule(&self, action: FrameAction, start_time_us: u32, frame: RadioFrame) -> bool {
        self.enqueue(action, start_time_us, frame)
    }
}
