pub mod button_handler;
pub mod buzzer;
pub mod grow_light;
pub mod pump;
pub mod sampler;
pub mod serial_console;

pub use button_handler::{ButtonEvent, ButtonHandler};
pub use buzzer::Buzzer;
pub use grow_light::GrowLight;
pub use pump::Pump;
pub use sampler::Conversion;
pub use serial_console::SerialConsole;

#[cfg(test)]
pub(crate) mod fake;
