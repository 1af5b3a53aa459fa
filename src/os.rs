//! System time and the outer loop

use core::cell::Cell;

use critical_section::Mutex;

use crate::config::{MAX_TASKS, READY_QUEUE_SLOTS};
use crate::rtos::{PowerState, Scheduler};

pub type SystemScheduler = Scheduler<'static, MAX_TASKS, READY_QUEUE_SLOTS>;

/// Global scheduler instance
pub static SCHEDULER: SystemScheduler = Scheduler::new();

/// Millisecond uptime counter, advanced from the tick interrupt.
pub struct Clock {
    uptime_ms: Mutex<Cell<u32>>,
}

impl Clock {
    pub const fn new() -> Self {
        Self {
            uptime_ms: Mutex::new(Cell::new(0)),
        }
    }

    #[inline]
    pub fn advance(&self, elapsed_ms: u32) {
        critical_section::with(|cs| {
            let uptime = self.uptime_ms.borrow(cs);
            uptime.set(uptime.get().wrapping_add(elapsed_ms));
        });
    }

    #[inline]
    pub fn uptime_ms(&self) -> u32 {
        critical_section::with(|cs| self.uptime_ms.borrow(cs).get())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

pub static CLOCK: Clock = Clock::new();

#[inline]
pub fn uptime_ms() -> u32 {
    CLOCK.uptime_ms()
}

/// One pass of the outer loop: drain the ready queue when there is work,
/// otherwise hand control to `wait` (normally the CPU sleep instruction).
/// Returns the number of task bodies run.
pub fn step<const TASKS: usize, const SLOTS: usize>(
    scheduler: &Scheduler<'_, TASKS, SLOTS>,
    wait: impl FnOnce(),
) -> usize {
    match scheduler.power_state() {
        PowerState::Awake => scheduler.drain(),
        PowerState::Sleeping => {
            wait();
            0
        }
    }
}

pub fn run<const TASKS: usize, const SLOTS: usize>(
    scheduler: &Scheduler<'_, TASKS, SLOTS>,
    mut wait: impl FnMut(),
) -> ! {
    loop {
        step(scheduler, &mut wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn clock_wraps_instead_of_overflowing() {
        let clock = Clock::new();
        clock.advance(u32::MAX);
        clock.advance(3);
        assert_eq!(clock.uptime_ms(), 2);
    }

    #[test]
    fn step_waits_while_sleeping() {
        let scheduler: Scheduler<'_, 2, 4> = Scheduler::new();
        let mut waited = 0;

        assert_eq!(step(&scheduler, || waited += 1), 0);
        assert_eq!(waited, 1);
    }

    #[test]
    fn step_drains_when_awake_without_waiting() {
        let runs = StdMutex::new(0u32);
        let body = || *runs.lock().unwrap() += 1;
        let scheduler: Scheduler<'_, 2, 4> = Scheduler::new();
        scheduler.register(&body, 2, 2, true).unwrap();
        scheduler.tick(2);

        let mut waited = false;
        assert_eq!(step(&scheduler, || waited = true), 1);
        assert!(!waited);
        assert_eq!(*runs.lock().unwrap(), 1);
        assert_eq!(scheduler.power_state(), PowerState::Sleeping);
    }
}
