use core::convert::Infallible;
use core::marker::PhantomData;

use avr_device::atmega128a::{PORTA, PORTB, PORTC, PORTD, PORTE, PORTF};
use embedded_hal::digital::v2::{InputPin, OutputPin};

pub trait PinMode {}
pub struct Input;
pub struct Output;
impl PinMode for Input {}
impl PinMode for Output {}

pub struct Pin<PORT, const P: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

/// Pin with the bit chosen at runtime, so pins of one port can share a type.
pub struct DynPin<PORT, MODE> {
    bit: u8,
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT, const P: u8, MODE: PinMode> Pin<PORT, P, MODE> {
    /// Pins are zero-sized handles; the caller must not take the same pin
    /// twice.
    pub const fn new() -> Self {
        Self {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }
}

macro_rules! impl_port {
    ($PORT:ident, $port:ident, $ddr:ident, $pin:ident) => {
        impl<const P: u8, MODE: PinMode> Pin<$PORT, P, MODE> {
            pub fn into_output(self) -> Pin<$PORT, P, Output> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin::new()
            }

            /// Input with the internal pull-up enabled.
            pub fn into_pull_up_input(self) -> Pin<$PORT, P, Input> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin::new()
            }
        }

        impl<const P: u8, MODE: PinMode> Pin<$PORT, P, MODE> {
            pub fn downgrade(self) -> DynPin<$PORT, MODE> {
                DynPin {
                    bit: P,
                    _port: PhantomData,
                    _mode: PhantomData,
                }
            }
        }

        impl OutputPin for DynPin<$PORT, Output> {
            type Error = Infallible;

            fn set_high(&mut self) -> Result<(), Self::Error> {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << self.bit)));
                }
                Ok(())
            }

            fn set_low(&mut self) -> Result<(), Self::Error> {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() & !(1 << self.bit)));
                }
                Ok(())
            }
        }

        impl InputPin for DynPin<$PORT, Input> {
            type Error = Infallible;

            fn is_high(&self) -> Result<bool, Self::Error> {
                Ok(unsafe { (*$PORT::ptr()).$pin.read().bits() } & (1 << self.bit) != 0)
            }

            fn is_low(&self) -> Result<bool, Self::Error> {
                self.is_high().map(|high| !high)
            }
        }

        impl<const P: u8> OutputPin for Pin<$PORT, P, Output> {
            type Error = Infallible;

            fn set_high(&mut self) -> Result<(), Self::Error> {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Ok(())
            }

            fn set_low(&mut self) -> Result<(), Self::Error> {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                }
                Ok(())
            }
        }

        impl<const P: u8> InputPin for Pin<$PORT, P, Input> {
            type Error = Infallible;

            fn is_high(&self) -> Result<bool, Self::Error> {
                Ok(unsafe { (*$PORT::ptr()).$pin.read().bits() } & (1 << P) != 0)
            }

            fn is_low(&self) -> Result<bool, Self::Error> {
                self.is_high().map(|high| !high)
            }
        }
    };
}

impl_port!(PORTA, porta, ddra, pina);
impl_port!(PORTB, portb, ddrb, pinb);
impl_port!(PORTC, portc, ddrc, pinc);
impl_port!(PORTD, portd, ddrd, pind);
impl_port!(PORTE, porte, ddre, pine);
impl_port!(PORTF, portf, ddrf, pinf);

/// Greenhouse board wiring. Each constructor claims its pins and must be
/// called once.
pub mod board {
    use super::*;
    use crate::config::PUMP_COUNT;

    pub type BuzzerPin = Pin<PORTA, 2, Output>;
    pub type PumpPin = DynPin<PORTA, Output>;
    pub type ButtonPin = DynPin<PORTD, Input>;

    pub fn buzzer() -> BuzzerPin {
        Pin::<PORTA, 2, Input>::new().into_output()
    }

    pub fn pumps() -> [PumpPin; PUMP_COUNT] {
        [
            Pin::<PORTA, 0, Input>::new().into_output().downgrade(),
            Pin::<PORTA, 1, Input>::new().into_output().downgrade(),
        ]
    }

    /// OC1A, driven by Timer1 once enabled.
    pub fn light_output() -> Pin<PORTB, 5, Output> {
        Pin::<PORTB, 5, Input>::new().into_output()
    }

    /// Button A, button B and joystick select, active low.
    pub fn buttons() -> [ButtonPin; 3] {
        [
            Pin::<PORTD, 4, Input>::new().into_pull_up_input().downgrade(),
            Pin::<PORTD, 5, Input>::new().into_pull_up_input().downgrade(),
            Pin::<PORTD, 6, Input>::new().into_pull_up_input().downgrade(),
        ]
    }
}
