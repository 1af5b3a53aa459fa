//! Timed watering
//!
//! Each pump has its own periodic task. Every run flips the pump and retimes
//! the task to the duration of the new phase, so the task period alternates
//! between the on and off durations.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::v2::OutputPin;
use heapless::Vec;

use crate::config::{LOW_WATER_LEVEL, PUMP_OFF_MS, PUMP_ON_MS};
use crate::drivers::Pump;
use crate::rtos::{TaskControl, TaskHandle};

struct Channel<P> {
    pump: Pump<P>,
    task: Option<TaskHandle>,
}

struct Inner<P, const N: usize> {
    channels: Vec<Channel<P>, N>,
    on_ms: i32,
    off_ms: i32,
    manual: bool,
    blocked: bool,
}

impl<P: OutputPin, const N: usize> Inner<P, N> {
    fn switch(&mut self, idx: usize, on: bool) {
        if let Some(channel) = self.channels.get_mut(idx) {
            if channel.pump.set(on).is_err() {
                crate::log_error!("irrigation: pump {} pin fault", idx);
            }
        }
    }

    fn switch_all(&mut self, on: bool) {
        for idx in 0..self.channels.len() {
            self.switch(idx, on);
        }
    }

    fn tasks(&self) -> Vec<TaskHandle, N> {
        self.channels.iter().filter_map(|c| c.task).collect()
    }
}

pub struct Irrigation<'a, P, const N: usize> {
    inner: Mutex<RefCell<Inner<P, N>>>,
    control: &'a dyn TaskControl,
}

impl<'a, P: OutputPin, const N: usize> Irrigation<'a, P, N> {
    pub const fn new(control: &'a dyn TaskControl) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                channels: Vec::new(),
                on_ms: PUMP_ON_MS,
                off_ms: PUMP_OFF_MS,
                manual: false,
                blocked: false,
            })),
            control,
        }
    }

    /// Returns the pump's index, or the pump back when all channels are taken.
    pub fn add_pump(&self, pump: Pump<P>) -> Result<usize, Pump<P>> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner
                .channels
                .push(Channel { pump, task: None })
                .map_err(|channel| channel.pump)?;
            Ok(inner.channels.len() - 1)
        })
    }

    pub fn attach_task(&self, idx: usize, task: TaskHandle) {
        critical_section::with(|cs| {
            if let Some(channel) = self.inner.borrow_ref_mut(cs).channels.get_mut(idx) {
                channel.task = Some(task);
            }
        });
    }

    /// Task body for pump `idx`.
    pub fn cycle(&self, idx: usize) {
        let next = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.manual || inner.blocked {
                return None;
            }
            let on = !inner.channels.get(idx)?.pump.is_on();
            inner.switch(idx, on);
            let period = if on { inner.on_ms } else { inner.off_ms };
            Some((inner.channels[idx].task?, period, on))
        });

        if let Some((task, period, on)) = next {
            crate::log_debug!("irrigation: pump {} {}", idx, if on { "on" } else { "off" });
            if self.control.set_period(task, period).is_err() || self.control.restart(task).is_err() {
                crate::log_error!("irrigation: pump {} task missing", idx);
            }
        }
    }

    /// Manual mode stops the timed cycle and turns every pump off.
    pub fn set_manual(&self, manual: bool) {
        let (tasks, off_ms) = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.manual = manual;
            inner.switch_all(false);
            (inner.tasks(), inner.off_ms)
        });

        for task in tasks {
            let retimed = if manual {
                self.control.set_active(task, false)
            } else {
                self.control
                    .set_active(task, true)
                    .and_then(|_| self.control.set_period(task, off_ms))
                    .and_then(|_| self.control.restart(task))
            };
            if retimed.is_err() {
                crate::log_error!("irrigation: pump task missing");
            }
        }
        crate::log_info!("irrigation: {}", if manual { "manual" } else { "timed" });
    }

    /// Ignored outside manual mode and while blocked.
    pub fn manual_power(&self, on: bool) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.manual && !inner.blocked {
                inner.switch_all(on);
            }
        });
    }

    /// A blocked system keeps every pump off until unblocked.
    pub fn set_blocked(&self, blocked: bool) {
        let changed = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let changed = inner.blocked != blocked;
            inner.blocked = blocked;
            if blocked {
                inner.switch_all(false);
            }
            changed
        });
        if changed {
            if blocked {
                crate::log_warn!("irrigation: blocked");
            } else {
                crate::log_info!("irrigation: unblocked");
            }
        }
    }

    /// Reservoir reading from the water level sensor.
    pub fn report_water(&self, level: i32) {
        self.set_blocked(level < LOW_WATER_LEVEL);
    }

    /// Applies from the next phase change. Non-positive durations are ignored.
    pub fn set_on_duration(&self, ms: i32) -> bool {
        ms > 0 && critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).on_ms = ms;
            true
        })
    }

    pub fn set_off_duration(&self, ms: i32) -> bool {
        ms > 0 && critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).off_ms = ms;
            true
        })
    }

    pub fn durations(&self) -> (i32, i32) {
        critical_section::with(|cs| {
            let inner = self.inner.borrow_ref(cs);
            (inner.on_ms, inner.off_ms)
        })
    }

    pub fn is_pumping(&self, idx: usize) -> bool {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .channels
                .get(idx)
                .map_or(false, |c| c.pump.is_on())
        })
    }

    pub fn is_manual(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).manual)
    }

    pub fn is_blocked(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fake::FakePin;
    use crate::rtos::Scheduler;

    type TestIrrigation<'a> = Irrigation<'a, FakePin, 2>;

    fn install(irrigation: &TestIrrigation<'_>) -> FakePin {
        let pin = FakePin::new();
        assert!(irrigation.add_pump(Pump::new(pin.clone()).unwrap()).is_ok());
        pin
    }

    #[test]
    fn cycle_alternates_phase_durations() {
        let noop = || {};
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let irrigation = TestIrrigation::new(&scheduler);
        let pin = install(&irrigation);
        let task = scheduler.register(&noop, PUMP_OFF_MS, PUMP_OFF_MS, true).unwrap();
        irrigation.attach_task(0, task);

        irrigation.cycle(0);
        assert!(pin.is_high());
        assert_eq!(scheduler.period(task), Ok(PUMP_ON_MS));
        assert_eq!(scheduler.countdown(task), Ok(PUMP_ON_MS));

        irrigation.cycle(0);
        assert!(!pin.is_high());
        assert_eq!(scheduler.period(task), Ok(PUMP_OFF_MS));
    }

    #[test]
    fn channels_are_bounded() {
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let irrigation = TestIrrigation::new(&scheduler);
        install(&irrigation);
        install(&irrigation);
        assert!(irrigation.add_pump(Pump::new(FakePin::new()).unwrap()).is_err());
    }

    #[test]
    fn low_water_blocks_the_pumps() {
        let noop = || {};
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let irrigation = TestIrrigation::new(&scheduler);
        let pin = install(&irrigation);
        let task = scheduler.register(&noop, PUMP_OFF_MS, PUMP_OFF_MS, true).unwrap();
        irrigation.attach_task(0, task);

        irrigation.cycle(0);
        irrigation.report_water(LOW_WATER_LEVEL - 1);
        assert!(irrigation.is_blocked());
        assert!(!pin.is_high());

        irrigation.cycle(0);
        assert!(!pin.is_high());

        irrigation.report_water(LOW_WATER_LEVEL);
        irrigation.cycle(0);
        assert!(pin.is_high());
    }

    #[test]
    fn manual_mode_pauses_the_cycle() {
        let noop = || {};
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let irrigation = TestIrrigation::new(&scheduler);
        let pin = install(&irrigation);
        let task = scheduler.register(&noop, PUMP_OFF_MS, PUMP_OFF_MS, true).unwrap();
        irrigation.attach_task(0, task);

        irrigation.manual_power(true);
        assert!(!pin.is_high());

        irrigation.cycle(0);
        irrigation.set_manual(true);
        assert!(!pin.is_high());
        assert_eq!(scheduler.is_active(task), Ok(false));

        irrigation.manual_power(true);
        assert!(irrigation.is_pumping(0));

        irrigation.set_blocked(true);
        assert!(!pin.is_high());
        irrigation.manual_power(true);
        assert!(!pin.is_high());

        irrigation.set_blocked(false);
        irrigation.set_manual(false);
        assert_eq!(scheduler.is_active(task), Ok(true));
        assert_eq!(scheduler.period(task), Ok(PUMP_OFF_MS));
    }

    #[test]
    fn missing_task_does_not_stop_the_other_pumps() {
        let noop = || {};
        let other: Scheduler<'_, 4, 4> = Scheduler::new();
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let irrigation = TestIrrigation::new(&scheduler);
        install(&irrigation);
        install(&irrigation);
        for _ in 0..3 {
            other.register(&noop, 10, 10, true).unwrap();
        }
        let stale = other.register(&noop, 10, 10, true).unwrap();
        let task = scheduler.register(&noop, PUMP_OFF_MS, PUMP_OFF_MS, true).unwrap();
        irrigation.attach_task(0, stale);
        irrigation.attach_task(1, task);

        irrigation.set_manual(true);
        assert_eq!(scheduler.is_active(task), Ok(false));

        assert!(irrigation.set_off_duration(30_000));
        irrigation.set_manual(false);
        assert_eq!(scheduler.is_active(task), Ok(true));
        assert_eq!(scheduler.period(task), Ok(30_000));
        assert_eq!(scheduler.countdown(task), Ok(30_000));
    }

    #[test]
    fn durations_reject_non_positive_values() {
        let scheduler: Scheduler<'_, 4, 4> = Scheduler::new();
        let irrigation = TestIrrigation::new(&scheduler);

        assert!(irrigation.set_on_duration(5_000));
        assert!(!irrigation.set_off_duration(0));
        assert_eq!(irrigation.durations(), (5_000, PUMP_OFF_MS));
    }
}
