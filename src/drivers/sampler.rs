//! Two-phase analog conversions
//!
//! Conversions take longer than a task body may run, so they are split in
//! a `start` and a later non-blocking `read`.

pub trait Conversion {
    type Error;

    fn start(&mut self) -> Result<(), Self::Error>;

    /// `WouldBlock` until the result is ready.
    fn read(&mut self) -> nb::Result<u16, Self::Error>;
}
