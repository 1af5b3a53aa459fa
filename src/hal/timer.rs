use avr_device::atmega128a::TC0;

use crate::config::{CPU_FREQ_HZ, TICK_MS};
use crate::os::{CLOCK, SCHEDULER};

/// Timer0 clock select. Timer0 has its own prescaler table on the ATmega128.
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
    Div1024 = 7,
}

impl Prescaler {
    const fn divisor(self) -> u32 {
        match self {
            Prescaler::Stop => 0,
            Prescaler::Direct => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div32 => 32,
            Prescaler::Div64 => 64,
            Prescaler::Div128 => 128,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }
}

const WGM01: u8 = 1 << 3;
const OCIE0: u8 = 1 << 1;
const TICK_PRESCALER: Prescaler = Prescaler::Div128;

// 16MHz / 128 = 125kHz, 250 counts per 2ms
const TICK_COMPARE: u8 =
    (CPU_FREQ_HZ / TICK_PRESCALER.divisor() * TICK_MS as u32 / 1000 - 1) as u8;

/// Timer0 in CTC mode raising a compare interrupt every `TICK_MS`.
pub struct SystemTimer {
    _tc0: TC0,
}

impl SystemTimer {
    pub fn new(tc0: TC0) -> Self {
        unsafe {
            let p = TC0::ptr();
            (*p).tccr0.write(|w| w.bits(0));
            (*p).tcnt0.write(|w| w.bits(0));
            (*p).ocr0.write(|w| w.bits(TICK_COMPARE));
        }
        Self { _tc0: tc0 }
    }

    /// Interrupts must be enabled globally for ticks to arrive.
    pub fn start(&mut self) {
        unsafe {
            let p = TC0::ptr();
            (*p).timsk.modify(|r, w| w.bits(r.bits() | OCIE0));
            (*p).tccr0.write(|w| w.bits(WGM01 | TICK_PRESCALER as u8));
        }
    }

    pub fn stop(&mut self) {
        unsafe {
            let p = TC0::ptr();
            (*p).tccr0.write(|w| w.bits(WGM01 | Prescaler::Stop as u8));
            (*p).timsk.modify(|r, w| w.bits(r.bits() & !OCIE0));
        }
    }
}

#[avr_device::interrupt(atmega128a)]
fn TIMER0_COMP() {
    CLOCK.advance(TICK_MS as u32);
    SCHEDULER.tick(TICK_MS);
}
