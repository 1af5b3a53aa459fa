use embedded_hal::digital::v2::OutputPin;

/// Water pump relay.
pub struct Pump<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Pump<P> {
    /// Takes the relay pin and drives it off.
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self { pin, on: false })
    }

    pub fn set(&mut self, on: bool) -> Result<(), P::Error> {
        if on {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.on = on;
        Ok(())
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State as PinState, Transaction as PinTransaction};

    #[test]
    fn tracks_relay_state() {
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ];
        let mut pin = PinMock::new(&expectations);
        let mut pump = Pump::new(pin.clone()).unwrap();

        assert!(!pump.is_on());
        pump.set(true).unwrap();
        assert!(pump.is_on());
        pump.set(false).unwrap();
        assert!(!pump.is_on());
        pin.done();
    }
}
