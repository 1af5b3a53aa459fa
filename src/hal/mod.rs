//! ATmega128A peripherals behind the embedded-hal traits

pub mod adc;
pub mod gpio;
pub mod power;
pub mod pwm;
pub mod timer;
pub mod uart;

pub use adc::{AdcChannel, AdcError, AnalogInput};
pub use gpio::{board, DynPin, Input, Output, Pin};
pub use power::{Power, SleepMode};
pub use pwm::Timer1Pwm;
pub use timer::{Prescaler, SystemTimer};
pub use uart::{set_rx_handler, Uart};
