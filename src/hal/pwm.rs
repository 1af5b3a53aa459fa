//! Timer1 fast PWM on OC1A
//!
//! ICR1 sets the period so the duty range is fixed at `TOP + 1` steps.

use avr_device::atmega128a::TC1;
use embedded_hal::PwmPin;

// 16MHz / (1kHz * 8)
const TOP: u16 = 2000 - 1;
const COM1A1: u8 = 1 << 7;
const WGM11: u8 = 1 << 1;
const WGM13_12: u8 = 0x18;
const CS_DIV8: u8 = 0x02;

/// OC1A (PB5) must be configured as an output by the caller.
pub struct Timer1Pwm {
    _tc1: TC1,
}

impl Timer1Pwm {
    pub fn new(tc1: TC1) -> Self {
        unsafe {
            let p = TC1::ptr();
            (*p).ocr1a.write(|w| w.bits(0));
            (*p).icr1.write(|w| w.bits(TOP));
            (*p).tccr1a.write(|w| w.bits(WGM11));
            (*p).tccr1b.write(|w| w.bits(WGM13_12 | CS_DIV8));
        }
        Self { _tc1: tc1 }
    }
}

impl PwmPin for Timer1Pwm {
    type Duty = u16;

    fn disable(&mut self) {
        unsafe {
            (*TC1::ptr()).tccr1a.modify(|r, w| w.bits(r.bits() & !COM1A1));
        }
    }

    fn enable(&mut self) {
        unsafe {
            (*TC1::ptr()).tccr1a.modify(|r, w| w.bits(r.bits() | COM1A1));
        }
    }

    fn get_duty(&self) -> u16 {
        unsafe { (*TC1::ptr()).ocr1a.read().bits() }
    }

    fn get_max_duty(&self) -> u16 {
        TOP
    }

    fn set_duty(&mut self, duty: u16) {
        unsafe {
            (*TC1::ptr()).ocr1a.write(|w| w.bits(duty.min(TOP)));
        }
    }
}
