use core::cell::Cell;
use core::marker::PhantomData;

use avr_device::atmega128a::ADC;
use critical_section::Mutex;

use crate::drivers::Conversion;

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdcChannel {
    Adc0 = 0,
    Adc1 = 1,
    Adc2 = 2,
    Adc3 = 3,
    Adc4 = 4,
    Adc5 = 5,
    Adc6 = 6,
    Adc7 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcError {
    /// Another channel's conversion has not been collected yet.
    Busy,
    /// `read` without a prior `start` on this channel.
    NotStarted,
}

const ADEN: u8 = 1 << 7;
const ADSC: u8 = 1 << 6;
// Prescaler 128, 125kHz at 16MHz
const ADPS_128: u8 = 0x07;
// AVCC reference
const REFS_AVCC: u8 = 0x40;
const MUX_MASK: u8 = 0x1F;

// The converter is shared; this records which channel owns the conversion
// in flight, or has a result waiting.
static OWNER: Mutex<Cell<Option<u8>>> = Mutex::new(Cell::new(None));

/// Enables the converter. Must run before any channel is used.
pub fn init(adc: ADC) -> Adc {
    unsafe {
        let p = ADC::ptr();
        (*p).adcsra.write(|w| w.bits(ADEN | ADPS_128));
        (*p).admux.write(|w| w.bits(REFS_AVCC));
    }
    Adc { _adc: adc }
}

/// Proof that the converter is enabled.
pub struct Adc {
    _adc: ADC,
}

impl Adc {
    pub fn channel(&self, channel: AdcChannel) -> AnalogInput {
        AnalogInput {
            channel,
            _adc: PhantomData,
        }
    }
}

/// One multiplexer input as a non-blocking `Conversion`.
pub struct AnalogInput {
    channel: AdcChannel,
    _adc: PhantomData<ADC>,
}

impl Conversion for AnalogInput {
    type Error = AdcError;

    fn start(&mut self) -> Result<(), Self::Error> {
        critical_section::with(|cs| {
            let owner = OWNER.borrow(cs);
            match owner.get() {
                Some(ch) if ch != self.channel as u8 => return Err(AdcError::Busy),
                _ => {}
            }
            unsafe {
                let p = ADC::ptr();
                (*p).admux
                    .modify(|r, w| w.bits((r.bits() & !MUX_MASK) | self.channel as u8));
                (*p).adcsra.modify(|r, w| w.bits(r.bits() | ADSC));
            }
            owner.set(Some(self.channel as u8));
            Ok(())
        })
    }

    fn read(&mut self) -> nb::Result<u16, Self::Error> {
        critical_section::with(|cs| {
            let owner = OWNER.borrow(cs);
            if owner.get() != Some(self.channel as u8) {
                return Err(nb::Error::Other(AdcError::NotStarted));
            }
            let value = unsafe {
                let p = ADC::ptr();
                if (*p).adcsra.read().bits() & ADSC != 0 {
                    return Err(nb::Error::WouldBlock);
                }
                (*p).adc.read().bits()
            };
            owner.set(None);
            Ok(value)
        })
    }
}
