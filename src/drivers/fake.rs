//! Test doubles for stateful multi-step scenarios. Each double shares its
//! state through an `Arc`, so a clone can be handed to the code under test
//! and the original inspected afterwards.

use core::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::PwmPin;

use super::Conversion;

#[derive(Clone, Default)]
pub struct FakePin {
    high: Arc<AtomicBool>,
}

impl FakePin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::SeqCst)
    }
}

impl OutputPin for FakePin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakePwm {
    duty: Arc<AtomicU16>,
    enabled: Arc<AtomicBool>,
    max: u16,
}

impl FakePwm {
    /// Starts enabled at full duty so that initialization is observable.
    pub fn new(max: u16) -> Self {
        Self {
            duty: Arc::new(AtomicU16::new(u16::MAX)),
            enabled: Arc::new(AtomicBool::new(true)),
            max,
        }
    }

    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl PwmPin for FakePwm {
    type Duty = u16;

    fn disable(&mut self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn enable(&mut self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn get_duty(&self) -> u16 {
        self.duty()
    }

    fn get_max_duty(&self) -> u16 {
        self.max
    }

    fn set_duty(&mut self, duty: u16) {
        self.duty.store(duty, Ordering::SeqCst);
    }
}

/// A conversion that completes on the `latency + 1`-th read after `start`.
#[derive(Clone)]
pub struct FakeConversion {
    value: Arc<AtomicU16>,
    starts: Arc<AtomicU32>,
    remaining: Arc<AtomicU32>,
    latency: u32,
    shared: Option<(Arc<AtomicU32>, u32)>,
}

const IDLE: u32 = u32::MAX;
const FREE: u32 = 0;

#[derive(Debug, PartialEq, Eq)]
pub struct Busy;

impl FakeConversion {
    pub fn new(value: u16, latency: u32) -> Self {
        Self {
            value: Arc::new(AtomicU16::new(value)),
            starts: Arc::new(AtomicU32::new(0)),
            remaining: Arc::new(AtomicU32::new(IDLE)),
            latency,
            shared: None,
        }
    }

    pub fn set_value(&self, value: u16) {
        self.value.store(value, Ordering::SeqCst);
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Conversion for FakeConversion {
    type Error = Busy;

    fn start(&mut self) -> Result<(), Self::Error> {
        if let Some((owner, id)) = &self.shared {
            match owner.load(Ordering::SeqCst) {
                FREE => owner.store(*id, Ordering::SeqCst),
                current if current != *id => return Err(Busy),
                _ => {}
            }
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.remaining.store(self.latency, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u16, Self::Error> {
        match self.remaining.load(Ordering::SeqCst) {
            IDLE => Err(nb::Error::WouldBlock),
            0 => {
                self.remaining.store(IDLE, Ordering::SeqCst);
                if let Some((owner, _)) = &self.shared {
                    owner.store(FREE, Ordering::SeqCst);
                }
                Ok(self.value.load(Ordering::SeqCst))
            }
            n => {
                self.remaining.store(n - 1, Ordering::SeqCst);
                Err(nb::Error::WouldBlock)
            }
        }
    }
}

/// Several channels behind one converter. A started conversion holds the
/// converter until its result is read, and other channels get `Busy`.
#[derive(Clone, Default)]
pub struct SharedConverter {
    owner: Arc<AtomicU32>,
    channels: Arc<AtomicU32>,
}

impl SharedConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, value: u16, latency: u32) -> FakeConversion {
        let id = self.channels.fetch_add(1, Ordering::SeqCst) + 1;
        FakeConversion {
            shared: Some((self.owner.clone(), id)),
            ..FakeConversion::new(value, latency)
        }
    }

    pub fn is_free(&self) -> bool {
        self.owner.load(Ordering::SeqCst) == FREE
    }
}
