use avr_device::atmega128a::CPU;

#[derive(Clone, Copy)]
#[repr(u8)]
pub enum SleepMode {
    Idle = 0,
    AdcNoiseReduction = 1,
    PowerDown = 2,
    PowerSave = 3,
    Standby = 6,
    ExtendedStandby = 7,
}

const SE: u8 = 1 << 5;
const SM_MASK: u8 = 0x1C;

// MCUCR orders the mode bits SM1, SM0, SM2
const fn sm_bits(mode: SleepMode) -> u8 {
    let m = mode as u8;
    ((m & 3) << 3) | (m & 4)
}

pub struct Power {
    _private: (),
}

impl Power {
    pub fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    pub fn set_sleep_mode(&mut self, mode: SleepMode) {
        unsafe {
            let p = CPU::ptr();
            (*p).mcucr
                .modify(|r, w| w.bits((r.bits() & !SM_MASK) | sm_bits(mode)));
        }
    }

    /// Sleeps until the next interrupt. Timer0 keeps running in idle mode,
    /// so the wait never outlasts one tick.
    pub fn enter_idle_mode(&mut self) {
        self.set_sleep_mode(SleepMode::Idle);
        unsafe {
            let p = CPU::ptr();
            (*p).mcucr.modify(|r, w| w.bits(r.bits() | SE));
            avr_device::asm::sleep();
            (*p).mcucr.modify(|r, w| w.bits(r.bits() & !SE));
        }
    }
}

impl Default for Power {
    fn default() -> Self {
        Self::new()
    }
}
