//! Grow light control from the ambient light sensor
//!
//! The sensor shares the converter with the temperature sensor, so a
//! reading follows the same two steps: the update task starts a conversion
//! and enables the collect task, which releases the converter as soon as
//! the result is in.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::PwmPin;

use crate::config::{LIGHT_LEVEL_SCALE, LIGHT_THRESHOLD_DEFAULT, MAX_BRIGHTNESS, MIN_BRIGHTNESS};
use crate::drivers::{Conversion, GrowLight};
use crate::rtos::{TaskControl, TaskHandle};

/// Brightness that tops up `level` to `threshold`, zero once the ambient
/// light reaches it.
pub fn brightness_for(level: i32, threshold: i32) -> i32 {
    if threshold <= 0 || level >= threshold {
        return 0;
    }
    (threshold - level.max(0)) * MAX_BRIGHTNESS / threshold
}

#[derive(Clone, Copy)]
struct LightTasks {
    update: TaskHandle,
    collect: TaskHandle,
}

struct Inner<C, P> {
    sensor: Option<C>,
    light: Option<GrowLight<P>>,
    threshold: i32,
    level: Option<i32>,
    manual: bool,
    tasks: Option<LightTasks>,
}

pub struct Lighting<'a, C, P> {
    inner: Mutex<RefCell<Inner<C, P>>>,
    control: &'a dyn TaskControl,
}

impl<'a, C, P> Lighting<'a, C, P>
where
    C: Conversion,
    P: PwmPin<Duty = u16>,
{
    pub const fn new(control: &'a dyn TaskControl) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                sensor: None,
                light: None,
                threshold: LIGHT_THRESHOLD_DEFAULT,
                level: None,
                manual: false,
                tasks: None,
            })),
            control,
        }
    }

    pub fn init(&self, sensor: C, light: GrowLight<P>) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.sensor = Some(sensor);
            inner.light = Some(light);
        });
    }

    pub fn attach_tasks(&self, update: TaskHandle, collect: TaskHandle) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).tasks = Some(LightTasks { update, collect });
        });
    }

    /// Update task body. Does nothing in manual mode.
    pub fn update(&self) {
        let (started, tasks) = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.manual {
                return (None, None);
            }
            let started = inner.sensor.as_mut().map(|sensor| sensor.start().is_ok());
            (started, inner.tasks)
        });

        match (started, tasks) {
            (Some(true), Some(tasks)) => {
                if self.control.set_active(tasks.collect, true).is_err() {
                    crate::log_error!("lighting: collect task missing");
                }
            }
            (Some(false), _) => crate::log_warn!("lighting: conversion not started"),
            _ => {}
        }
    }

    /// Collect task body. Stays enabled until the conversion completes; a
    /// reading that lands in manual mode only frees the converter.
    pub fn collect(&self) {
        let (done, tasks) = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let tasks = inner.tasks;
            let Inner {
                sensor,
                light,
                threshold,
                level,
                manual,
                ..
            } = &mut *inner;
            let Some(sensor) = sensor.as_mut() else {
                return (true, tasks);
            };

            match sensor.read() {
                Ok(raw) => {
                    let measured = raw as i32 * LIGHT_LEVEL_SCALE;
                    *level = Some(measured);
                    if let (false, Some(light)) = (*manual, light.as_mut()) {
                        let brightness = brightness_for(measured, *threshold);
                        light.set_brightness(brightness);
                        light.power(brightness > 0);
                    }
                    (true, tasks)
                }
                Err(nb::Error::WouldBlock) => (false, tasks),
                Err(nb::Error::Other(_)) => {
                    crate::log_warn!("lighting: conversion failed");
                    (true, tasks)
                }
            }
        });

        if let (true, Some(tasks)) = (done, tasks) {
            if self.control.set_active(tasks.collect, false).is_err() {
                crate::log_error!("lighting: collect task missing");
            }
        }
    }

    /// Clamped to the dimmable range; returns the value applied.
    pub fn set_threshold(&self, threshold: i32) -> i32 {
        let threshold = threshold.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).threshold = threshold);
        threshold
    }

    pub fn threshold(&self) -> i32 {
        critical_section::with(|cs| self.inner.borrow_ref(cs).threshold)
    }

    pub fn set_update_interval(&self, period_ms: i32) {
        if let Some(tasks) = critical_section::with(|cs| self.inner.borrow_ref(cs).tasks) {
            if self.control.set_period(tasks.update, period_ms).is_err() {
                crate::log_warn!("lighting: update interval {} rejected", period_ms);
            }
        }
    }

    pub fn set_manual(&self, manual: bool) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).manual = manual);
    }

    /// Full brightness or off. Ignored outside manual mode.
    pub fn manual_power(&self, on: bool) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if !inner.manual {
                return;
            }
            if let Some(light) = inner.light.as_mut() {
                light.set_brightness(if on { MAX_BRIGHTNESS } else { 0 });
                light.power(on);
            }
        });
    }

    /// Last measured ambient level.
    pub fn level(&self) -> Option<i32> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).level)
    }

    pub fn brightness(&self) -> i32 {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .light
                .as_ref()
                .map_or(0, GrowLight::brightness)
        })
    }

    pub fn is_on(&self) -> bool {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .light
                .as_ref()
                .map_or(false, GrowLight::is_on)
        })
    }
}
