//! Temperature monitoring and the alarm buzzer
//!
//! A reading takes two scheduled steps. The start task fires at the poll
//! interval, kicks off a conversion and enables the collect task. The
//! collect task polls the conversion at a short period until it completes,
//! then stores the reading and disables itself.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::v2::OutputPin;
use ufmt::derive::uDebug;

use crate::config::{ADC_VREF_MV, AIR_QUALITY_LIMIT, TEMPERATURE_HIGHER, TEMPERATURE_LOWER};
use crate::drivers::{Buzzer, Conversion};
use crate::rtos::{TaskControl, TaskHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum Comfort {
    Cold,
    Comfortable,
    Hot,
}

/// 10-bit reading of a 10 mV/°C sensor.
pub fn raw_to_celsius(raw: u16) -> i32 {
    let millivolts = raw as u32 * ADC_VREF_MV / 1024;
    (millivolts / 10) as i32
}

#[derive(Clone, Copy)]
struct ClimateTasks {
    start: TaskHandle,
    collect: TaskHandle,
}

struct Inner<C, P> {
    sensor: Option<C>,
    buzzer: Option<Buzzer<P>>,
    lower: i32,
    higher: i32,
    temperature: Option<i32>,
    air_alarm: bool,
    tasks: Option<ClimateTasks>,
}

impl<C, P: OutputPin> Inner<C, P> {
    fn comfort(&self) -> Option<Comfort> {
        let temperature = self.temperature?;
        Some(if temperature < self.lower {
            Comfort::Cold
        } else if temperature > self.higher {
            Comfort::Hot
        } else {
            Comfort::Comfortable
        })
    }

    fn update_alarm(&mut self) {
        let out_of_range = matches!(self.comfort(), Some(Comfort::Cold | Comfort::Hot));
        let active = out_of_range || self.air_alarm;
        if let Some(buzzer) = self.buzzer.as_mut() {
            if buzzer.alarm(active).is_err() {
                crate::log_error!("climate: buzzer pin fault");
            }
        }
    }
}

pub struct Climate<'a, C, P> {
    inner: Mutex<RefCell<Inner<C, P>>>,
    control: &'a dyn TaskControl,
}

impl<'a, C, P> Climate<'a, C, P>
where
    C: Conversion,
    P: OutputPin,
{
    pub const fn new(control: &'a dyn TaskControl) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                sensor: None,
                buzzer: None,
                lower: TEMPERATURE_LOWER,
                higher: TEMPERATURE_HIGHER,
                temperature: None,
                air_alarm: false,
                tasks: None,
            })),
            control,
        }
    }

    pub fn init(&self, sensor: C, buzzer: Buzzer<P>) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.sensor = Some(sensor);
            inner.buzzer = Some(buzzer);
        });
    }

    pub fn attach_tasks(&self, start: TaskHandle, collect: TaskHandle) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).tasks = Some(ClimateTasks { start, collect });
        });
    }

    /// Start task body.
    pub fn start_conversion(&self) {
        let (started, tasks) = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let started = match inner.sensor.as_mut() {
                Some(sensor) => sensor.start().is_ok(),
                None => false,
            };
            (started, inner.tasks)
        });

        match (started, tasks) {
            (true, Some(tasks)) => {
                if self.control.set_active(tasks.collect, true).is_err() {
                    crate::log_error!("climate: collect task missing");
                }
            }
            (false, _) => crate::log_warn!("climate: conversion not started"),
            _ => {}
        }
    }

    /// Collect task body. Leaves the task enabled while the conversion is
    /// still running.
    pub fn collect(&self) {
        let (done, tasks) = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let tasks = inner.tasks;
            let reading = match inner.sensor.as_mut() {
                Some(sensor) => sensor.read(),
                None => return (true, tasks),
            };
            match reading {
                Ok(raw) => {
                    inner.temperature = Some(raw_to_celsius(raw));
                    inner.update_alarm();
                    (true, tasks)
                }
                Err(nb::Error::WouldBlock) => (false, tasks),
                Err(nb::Error::Other(_)) => {
                    crate::log_warn!("climate: conversion failed");
                    (true, tasks)
                }
            }
        });

        if let (true, Some(tasks)) = (done, tasks) {
            if self.control.set_active(tasks.collect, false).is_err() {
                crate::log_error!("climate: collect task missing");
            }
        }
        if done {
            if let Some(temperature) = self.temperature() {
                crate::log_debug!("climate: {}C", temperature);
            }
        }
    }

    pub fn temperature(&self) -> Option<i32> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).temperature)
    }

    /// `None` until the first reading.
    pub fn comfort(&self) -> Option<Comfort> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).comfort())
    }

    pub fn thresholds(&self) -> (i32, i32) {
        critical_section::with(|cs| {
            let inner = self.inner.borrow_ref(cs);
            (inner.lower, inner.higher)
        })
    }

    /// Rejected unless strictly below the higher threshold.
    pub fn set_lower_threshold(&self, lower: i32) -> bool {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if lower >= inner.higher {
                return false;
            }
            inner.lower = lower;
            inner.update_alarm();
            true
        })
    }

    /// Rejected unless strictly above the lower threshold.
    pub fn set_higher_threshold(&self, higher: i32) -> bool {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if higher <= inner.lower {
                return false;
            }
            inner.higher = higher;
            inner.update_alarm();
            true
        })
    }

    pub fn set_poll_interval(&self, period_ms: i32) {
        if let Some(tasks) = critical_section::with(|cs| self.inner.borrow_ref(cs).tasks) {
            if self.control.set_period(tasks.start, period_ms).is_err() {
                crate::log_warn!("climate: poll interval {} rejected", period_ms);
            }
        }
    }

    /// Air quality readings share the buzzer with the temperature alarm.
    pub fn report_air(&self, value: i32) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.air_alarm = value > AIR_QUALITY_LIMIT;
            inner.update_alarm();
        });
    }

    pub fn set_buzzer_manual(&self, manual: bool) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if let Some(buzzer) = inner.buzzer.as_mut() {
                buzzer.set_manual(manual);
            }
            if !manual {
                inner.update_alarm();
            }
        });
    }

    pub fn buzzer_power(&self, on: bool) {
        critical_section::with(|cs| {
            if let Some(buzzer) = self.inner.borrow_ref_mut(cs).buzzer.as_mut() {
                if buzzer.manual_power(on).is_err() {
                    crate::log_error!("climate: buzzer pin fault");
                }
            }
        });
    }

    pub fn buzzer_on(&self) -> bool {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .buzzer
                .as_ref()
                .map_or(false, Buzzer::is_on)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fake::{FakeConversion, FakePin};
    use crate::rtos::Scheduler;

    type TestClimate<'a> = Climate<'a, FakeConversion, FakePin>;

    // 25 C
    const MILD: u16 = 52;
    // 35 C
    const HOT: u16 = 72;

    fn install(climate: &TestClimate<'_>, value: u16, latency: u32) -> (FakeConversion, FakePin) {
        let sensor = FakeConversion::new(value, latency);
        let pin = FakePin::new();
        climate.init(sensor.clone(), Buzzer::new(pin.clone()).unwrap());
        (sensor, pin)
    }

    #[test]
    fn raw_readings_convert_to_celsius() {
        assert_eq!(raw_to_celsius(0), 0);
        assert_eq!(raw_to_celsius(MILD), 25);
        assert_eq!(raw_to_celsius(HOT), 35);
    }

    #[test]
    fn reading_completes_over_two_scheduled_phases() {
        let noop = || {};
        let scheduler: Scheduler<'_, 4, 8> = Scheduler::new();
        let climate = TestClimate::new(&scheduler);
        let (sensor, _pin) = install(&climate, MILD, 2);

        let start_task = scheduler.register(&noop, 100, 100, true).unwrap();
        let collect_task = scheduler.register(&noop, 10, 10, false).unwrap();
        climate.attach_tasks(start_task, collect_task);

        climate.start_conversion();
        assert_eq!(sensor.starts(), 1);
        assert_eq!(scheduler.is_active(collect_task), Ok(true));

        climate.collect();
        climate.collect();
        assert_eq!(climate.temperature(), None);
        assert_eq!(scheduler.is_active(collect_task), Ok(true));

        climate.collect();
        assert_eq!(climate.temperature(), Some(25));
        assert_eq!(climate.comfort(), Some(Comfort::Comfortable));
        assert_eq!(scheduler.is_active(collect_task), Ok(false));
    }

    #[test]
    fn out_of_range_temperature_sounds_the_buzzer() {
        let scheduler: Scheduler<'_, 4, 8> = Scheduler::new();
        let climate = TestClimate::new(&scheduler);
        let (sensor, pin) = install(&climate, HOT, 0);

        climate.start_conversion();
        climate.collect();
        assert_eq!(climate.comfort(), Some(Comfort::Hot));
        assert!(pin.is_high());

        sensor.set_value(MILD);
        climate.start_conversion();
        climate.collect();
        assert!(!pin.is_high());
    }

    #[test]
    fn air_alarm_keeps_the_buzzer_on() {
        let scheduler: Scheduler<'_, 4, 8> = Scheduler::new();
        let climate = TestClimate::new(&scheduler);
        let (_sensor, pin) = install(&climate, MILD, 0);

        climate.report_air(AIR_QUALITY_LIMIT + 1);
        assert!(pin.is_high());

        climate.start_conversion();
        climate.collect();
        assert!(climate.buzzer_on());

        climate.report_air(AIR_QUALITY_LIMIT);
        assert!(!climate.buzzer_on());
    }

    #[test]
    fn manual_buzzer_ignores_the_alarm() {
        let scheduler: Scheduler<'_, 4, 8> = Scheduler::new();
        let climate = TestClimate::new(&scheduler);
        let (_sensor, pin) = install(&climate, HOT, 0);

        climate.set_buzzer_manual(true);
        climate.start_conversion();
        climate.collect();
        assert!(!pin.is_high());

        climate.buzzer_power(true);
        assert!(pin.is_high());

        climate.buzzer_power(false);
        climate.set_buzzer_manual(false);
        assert!(pin.is_high());
    }

    #[test]
    fn thresholds_must_stay_ordered() {
        let scheduler: Scheduler<'_, 4, 8> = Scheduler::new();
        let climate = TestClimate::new(&scheduler);

        assert!(!climate.set_lower_threshold(TEMPERATURE_HIGHER));
        assert!(!climate.set_higher_threshold(TEMPERATURE_LOWER));
        assert!(climate.set_lower_threshold(15));
        assert!(climate.set_higher_threshold(16));
        assert_eq!(climate.thresholds(), (15, 16));
    }

    #[test]
    fn poll_interval_retimes_the_start_task() {
        let noop = || {};
        let scheduler: Scheduler<'_, 4, 8> = Scheduler::new();
        let climate = TestClimate::new(&scheduler);
        let start_task = scheduler.register(&noop, 5500, 5500, true).unwrap();
        let collect_task = scheduler.register(&noop, 10, 10, false).unwrap();
        climate.attach_tasks(start_task, collect_task);

        climate.set_poll_interval(60_000);
        assert_eq!(scheduler.period(start_task), Ok(60_000));

        climate.set_poll_interval(0);
        assert_eq!(scheduler.period(start_task), Ok(60_000));
    }
}
